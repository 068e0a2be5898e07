use serde::{Deserialize, Serialize};

/// Limit/offset window requested by a list endpoint. Without a limit the
/// whole result set is returned as a bare array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub offset: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum Listing<T> {
    All(Vec<T>),
    Page(PageContext<T>),
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        let next_offset = current_offset + page_size;
        let next = (next_offset < total_rows).then_some(next_offset);
        let previous = (current_offset > 0).then(|| (current_offset - page_size).max(0));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }
}

impl PageRequest {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }

    /// Whether a limited page came back empty only because the offset is past
    /// the end, so the total has to be counted separately.
    pub fn past_end(&self, fetched_rows: usize) -> bool {
        self.limit.is_some() && self.offset > 0 && fetched_rows == 0
    }

    /// `total_rows` is the window count carried by the fetched rows.
    pub fn listing<T>(&self, rows: Vec<T>, total_rows: i64) -> Listing<T> {
        match self.limit {
            Some(limit) => Listing::Page(PageContext::from_rows(
                rows,
                total_rows,
                limit,
                self.offset,
            )),
            None => Listing::All(rows),
        }
    }
}
