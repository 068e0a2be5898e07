use std::collections::HashMap;

use crate::{
    error::{Error, HtmlError, QueryError},
    form::RecipeForm,
    media::media_url,
    pagination::{Listing, PageRequest},
    schema::{
        Attribute, AttributeKind, Id, Recipe, RecipeDetail, RecipeImage, RecipeRow, RecipeSummary,
    },
};

use super::attributes::{assign_attributes, list_recipe_attributes};
use sqlx::{PgConnection, PgExecutor, Pool, Postgres, QueryBuilder};

const RECIPE_COLUMNS: &str = "r.id, r.user_id, r.title, r.time_minutes, r.price::TEXT AS price, r.description, r.link, r.image";

/// Optional id filters for the recipe list. Within one filter a recipe
/// matches when it carries any of the ids; both filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeFilter {
    fn ids(&self, kind: AttributeKind) -> Option<&Vec<Id>> {
        match kind {
            AttributeKind::Tag => self.tags.as_ref(),
            AttributeKind::Ingredient => self.ingredients.as_ref(),
        }
    }
}

fn build_detail(
    recipe: Recipe,
    tags: &mut HashMap<Id, Vec<Attribute>>,
    ingredients: &mut HashMap<Id, Vec<Attribute>>,
) -> RecipeDetail {
    RecipeDetail {
        id: recipe.id,
        user: recipe.user_id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        link: recipe.link,
        tags: tags.remove(&recipe.id).unwrap_or_default(),
        ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
        description: recipe.description,
        image: recipe.image.as_deref().map(media_url),
    }
}

/// Owner scope plus the tag/ingredient filters, shared by the page query
/// and the separate total count.
fn push_recipe_filters(query: &mut QueryBuilder<'_, Postgres>, user_id: Id, filter: &RecipeFilter) {
    query.push(" WHERE r.user_id = ").push_bind(user_id);

    for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
        if let Some(ids) = filter.ids(kind) {
            query
                .push(format!(
                    " AND EXISTS (SELECT 1 FROM {} l WHERE l.recipe_id = r.id AND l.{} = ANY(",
                    kind.link_table(),
                    kind.link_column()
                ))
                .push_bind(ids.clone())
                .push("))");
        }
    }
}

async fn count_recipes(
    user_id: Id,
    filter: &RecipeFilter,
    pool: &Pool<Postgres>,
) -> Result<i64, Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_recipe_filters(&mut query, user_id, filter);

    let total: i64 = query
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(total)
}

pub async fn fetch_recipes(
    user_id: Id,
    filter: &RecipeFilter,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Listing<RecipeSummary>, Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {RECIPE_COLUMNS}, COUNT(*) OVER() AS count FROM recipes r"
    ));
    push_recipe_filters(&mut query, user_id, filter);

    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.past_end(rows.len()) => count_recipes(user_id, filter, pool).await?,
        None => 0,
    };
    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();

    let mut tags = list_recipe_attributes(AttributeKind::Tag, &ids, pool).await?;
    let mut ingredients = list_recipe_attributes(AttributeKind::Ingredient, &ids, pool).await?;

    let rows: Vec<RecipeSummary> = rows
        .into_iter()
        .map(|row| build_detail(Recipe::from(row), &mut tags, &mut ingredients).summary())
        .collect();

    Ok(page.listing(rows, total_count))
}

pub async fn get_recipe<'e, E>(id: Id, user_id: Id, executor: E) -> Result<Option<Recipe>, Error>
where
    E: PgExecutor<'e>,
{
    let row: Option<Recipe> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1 AND r.user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

async fn load_detail(
    id: Id,
    user_id: Id,
    conn: &mut PgConnection,
) -> Result<Option<RecipeDetail>, Error> {
    let recipe = match get_recipe(id, user_id, &mut *conn).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let mut tags = list_recipe_attributes(AttributeKind::Tag, &[id], &mut *conn).await?;
    let mut ingredients =
        list_recipe_attributes(AttributeKind::Ingredient, &[id], &mut *conn).await?;

    Ok(Some(build_detail(recipe, &mut tags, &mut ingredients)))
}

pub async fn get_recipe_detail(
    id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, Error> {
    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    load_detail(id, user_id, &mut conn).await
}

/// Creates the recipe and its tag/ingredient associations atomically.
pub async fn create_recipe(
    user_id: Id,
    form: RecipeForm,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    let (Some(title), Some(time_minutes), Some(price)) = (form.title, form.time_minutes, form.price)
    else {
        return Err(HtmlError::InvalidRequest.new("Missing recipe fields"));
    };

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
        VALUES ($1, $2, $3, $4::NUMERIC, $5, $6)
        RETURNING id
    ",
    )
    .bind(user_id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .bind(form.description.unwrap_or_default())
    .bind(form.link.unwrap_or_default())
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    let recipe_id = id.0;

    assign_attributes(
        AttributeKind::Tag,
        recipe_id,
        user_id,
        &form.tags.unwrap_or_default(),
        &mut tx,
    )
    .await?;
    assign_attributes(
        AttributeKind::Ingredient,
        recipe_id,
        user_id,
        &form.ingredients.unwrap_or_default(),
        &mut tx,
    )
    .await?;

    let detail = load_detail(recipe_id, user_id, &mut tx)
        .await?
        .ok_or(HtmlError::Internal.new("Created recipe disappeared"))?;

    tx.commit().await.map_err(QueryError::from)?;
    log::info!("User {user_id} created recipe {recipe_id}");

    Ok(detail)
}

/// Updates the caller's recipe. Absent scalar fields keep their value.
/// Tag and ingredient lists replace the current set when present; on a full
/// update an absent list counts as empty.
pub async fn update_recipe(
    id: Id,
    user_id: Id,
    form: RecipeForm,
    partial: bool,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let updated: Option<(Id,)> = sqlx::query_as(
        "
        UPDATE recipes SET
        title = COALESCE($1, title),
        time_minutes = COALESCE($2, time_minutes),
        price = COALESCE($3::NUMERIC, price),
        description = COALESCE($4, description),
        link = COALESCE($5, link)
        WHERE id = $6 AND user_id = $7
        RETURNING id
    ",
    )
    .bind(form.title)
    .bind(form.time_minutes)
    .bind(form.price)
    .bind(form.description)
    .bind(form.link)
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if updated.is_none() {
        return Ok(None);
    }

    for (kind, names) in [
        (AttributeKind::Tag, form.tags),
        (AttributeKind::Ingredient, form.ingredients),
    ] {
        let names = match (names, partial) {
            (Some(names), _) => names,
            (None, false) => vec![],
            (None, true) => continue,
        };

        assign_attributes(kind, id, user_id, &names, &mut tx).await?;
    }

    let detail = load_detail(id, user_id, &mut tx).await?;
    tx.commit().await.map_err(QueryError::from)?;

    Ok(detail)
}

/// Association rows go with the recipe; the tags and ingredients stay.
pub async fn delete_recipe(id: Id, user_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() > 0 {
        log::info!("User {user_id} deleted recipe {id}");
    }

    Ok(result.rows_affected() > 0)
}

/// Points the recipe at a stored image, given as a path under the media root.
pub async fn set_recipe_image(
    id: Id,
    user_id: Id,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeImage>, Error> {
    let row: Option<(Id, Option<String>)> = sqlx::query_as(
        "UPDATE recipes SET image = $1 WHERE id = $2 AND user_id = $3 RETURNING id, image",
    )
    .bind(image)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.map(|(id, image)| RecipeImage {
        id,
        image: image.as_deref().map(media_url),
    }))
}
