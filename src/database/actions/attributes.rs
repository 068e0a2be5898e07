use std::collections::HashMap;

use crate::{
    error::{Error, QueryError},
    pagination::{Listing, PageRequest},
    schema::{Attribute, AttributeKind, AttributeRow, Id, LinkedAttribute},
};

use sqlx::{PgConnection, PgExecutor, Pool, Postgres};

/// Lists the caller's tags or ingredients in descending name order. With
/// `assigned_only` only rows attached to at least one recipe are returned.
pub async fn list_attributes(
    kind: AttributeKind,
    user_id: Id,
    assigned_only: bool,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Listing<Attribute>, Error> {
    let table = kind.table();
    let assigned = if assigned_only {
        format!(
            "AND EXISTS (SELECT 1 FROM {} l WHERE l.{} = a.id)",
            kind.link_table(),
            kind.link_column()
        )
    } else {
        String::new()
    };

    let rows: Vec<AttributeRow> = sqlx::query_as(&format!(
        "SELECT a.id, a.name, COUNT(*) OVER() AS count FROM {table} a WHERE a.user_id = $1 {assigned} ORDER BY a.name DESC, a.id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.past_end(rows.len()) => {
            let total: (i64,) = sqlx::query_as(&format!(
                "SELECT COUNT(*) FROM {table} a WHERE a.user_id = $1 {assigned}"
            ))
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;
            total.0
        }
        None => 0,
    };
    let rows = rows.into_iter().map(Attribute::from).collect();

    Ok(page.listing(rows, total_count))
}

pub async fn get_attribute(
    kind: AttributeKind,
    id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, Error> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "SELECT id, name FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_attribute<'e, E>(
    kind: AttributeKind,
    user_id: Id,
    name: &str,
    executor: E,
) -> Result<Attribute, Error>
where
    E: PgExecutor<'e>,
{
    let row: Attribute = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, name",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(executor)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn update_attribute(
    kind: AttributeKind,
    id: Id,
    user_id: Id,
    name: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, Error> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {} SET name = COALESCE($1, name) WHERE id = $2 AND user_id = $3 RETURNING id, name",
        kind.table()
    ))
    .bind(name)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Deleting detaches the row from every recipe through the cascade.
pub async fn delete_attribute(
    kind: AttributeKind,
    id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_attribute<'e, E>(
    kind: AttributeKind,
    user_id: Id,
    name: &str,
    executor: E,
) -> Result<Option<Id>, Error>
where
    E: PgExecutor<'e>,
{
    let row: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .fetch_optional(executor)
    .await
    .map_err(QueryError::from)?;

    Ok(row.map(|r| r.0))
}

/// Returns the caller's row with this exact name, creating it when missing.
pub async fn get_or_create_attribute(
    kind: AttributeKind,
    user_id: Id,
    name: &str,
    conn: &mut PgConnection,
) -> Result<Id, Error> {
    if let Some(id) = find_attribute(kind, user_id, name, &mut *conn).await? {
        return Ok(id);
    }

    let created = create_attribute(kind, user_id, name, &mut *conn).await?;
    log::debug!("Created {} {:?} for user {user_id}", kind.table(), created.name);

    Ok(created.id)
}

/// Replaces the recipe's tags or ingredients with `names`, resolved against
/// the owner's own rows. An empty list leaves the recipe with none.
pub async fn assign_attributes(
    kind: AttributeKind,
    recipe_id: Id,
    user_id: Id,
    names: &[String],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let link_table = kind.link_table();
    let link_column = kind.link_column();

    sqlx::query(&format!("DELETE FROM {link_table} WHERE recipe_id = $1"))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    for name in names {
        let attribute_id = get_or_create_attribute(kind, user_id, name, conn).await?;

        sqlx::query(&format!(
            "INSERT INTO {link_table} (recipe_id, {link_column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    }

    log::debug!(
        "Recipe {recipe_id} now has {} {}",
        names.len(),
        kind.field()
    );

    Ok(())
}

/// Attributes of each given recipe, ordered by id.
pub async fn list_recipe_attributes<'e, E>(
    kind: AttributeKind,
    recipe_ids: &[Id],
    executor: E,
) -> Result<HashMap<Id, Vec<Attribute>>, Error>
where
    E: PgExecutor<'e>,
{
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<LinkedAttribute> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id AS recipe_id, a.id AS id, a.name AS name
        FROM {} l
        INNER JOIN {} a ON a.id = l.{}
        WHERE l.recipe_id = ANY($1)
        ORDER BY a.id
    ",
        kind.link_table(),
        kind.table(),
        kind.link_column()
    ))
    .bind(recipe_ids)
    .fetch_all(executor)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Id, Vec<Attribute>> = HashMap::new();
    rows.into_iter().for_each(|x| {
        hashmap.entry(x.recipe_id).or_default().push(Attribute {
            id: x.id,
            name: x.name,
        })
    });

    Ok(hashmap)
}
