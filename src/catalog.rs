use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::domain::Note;
use crate::error::HubResult;
use crate::store::{NOTE_COLUMNS, Store, note_from_row};

/// Default number of items per catalog page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;
/// Hard cap on items per catalog page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Catalog sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Newest first (default).
    #[default]
    Latest,
    /// Most upvoted first.
    Top,
    /// Most downvoted first.
    Bottom,
}

/// Filter, sort, and pagination options for a catalog listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    pub page: u32,
    pub page_size: u32,
    pub text_query: Option<String>,
    pub subject: Option<String>,
    pub university: Option<String>,
    pub tags: Vec<String>,
    pub sort: SortMode,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            text_query: None,
            subject: None,
            university: None,
            tags: Vec::new(),
            sort: SortMode::Latest,
        }
    }
}

/// One page of catalog results. `total` and `page_count` cover the whole
/// filtered set, not just this page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePage {
    pub items: Vec<Note>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
}

/// Paginated, filtered, searchable listing over the note collection.
///
/// The visibility predicate is conjoined before every other filter and
/// cannot be bypassed by any option combination: guests see only public
/// notes, signed-in viewers additionally see their own private ones.
pub struct Catalog {
    store: Store,
}

impl Catalog {
    pub fn new(store: &Store) -> Self {
        Catalog {
            store: store.clone(),
        }
    }

    pub async fn list(&self, viewer: Option<&str>, opts: &ListOptions) -> HubResult<NotePage> {
        let page = opts.page.max(1);
        let page_size = opts.page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = i64::from(page - 1) * i64::from(page_size);

        let text = opts
            .text_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM notes WHERE ");
        self.push_filters(&mut count_query, viewer, opts, text);

        let row = count_query.build().fetch_one(&self.store.pool).await?;
        let total: i64 = row.get(0);
        let total = total.max(0) as u64;

        let mut list_query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {NOTE_COLUMNS} FROM notes WHERE "));
        self.push_filters(&mut list_query, viewer, opts, text);

        list_query.push(match opts.sort {
            SortMode::Latest => " ORDER BY created_at DESC, rowid DESC",
            SortMode::Top => " ORDER BY upvotes DESC, created_at DESC",
            SortMode::Bottom => " ORDER BY downvotes DESC, created_at DESC",
        });

        list_query.push(" LIMIT ");
        list_query.push_bind(i64::from(page_size));
        list_query.push(" OFFSET ");
        list_query.push_bind(offset);

        let rows = list_query.build().fetch_all(&self.store.pool).await?;
        let items: Vec<Note> = rows.iter().map(note_from_row).collect::<HubResult<_>>()?;

        let page_count = (total.div_ceil(u64::from(page_size))) as u32;

        Ok(NotePage {
            items,
            total,
            page,
            page_size,
            page_count,
        })
    }

    /// Appends the conjunctive WHERE clauses: visibility first, then the
    /// facet filters, tag intersection, and text search.
    fn push_filters(
        &self,
        query: &mut QueryBuilder<'_, Sqlite>,
        viewer: Option<&str>,
        opts: &ListOptions,
        text: Option<&str>,
    ) {
        query.push("(visibility = 'public'");
        if let Some(viewer) = viewer {
            query.push(" OR owner_id = ");
            query.push_bind(viewer.to_owned());
        }
        query.push(")");

        if let Some(subject) = opts.subject.as_deref() {
            query.push(" AND subject = ");
            query.push_bind(subject.to_owned());
        }

        if let Some(university) = opts.university.as_deref() {
            query.push(" AND university = ");
            query.push_bind(university.to_owned());
        }

        let tags: Vec<String> = opts
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_owned())
            .collect();
        if !tags.is_empty() {
            query.push(
                " AND EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value IN (",
            );
            let mut values = query.separated(", ");
            for tag in tags {
                values.push_bind(tag);
            }
            query.push("))");
        }

        if let Some(text) = text {
            if self.store.text_search {
                query.push(
                    " AND id IN (SELECT note_id FROM note_search WHERE note_search MATCH ",
                );
                query.push_bind(fts_query(text));
                query.push(")");
            } else {
                let pattern = format!("%{text}%");
                query.push(" AND (title LIKE ");
                query.push_bind(pattern.clone());
                query.push(" OR subject LIKE ");
                query.push_bind(pattern.clone());
                query.push(" OR university LIKE ");
                query.push_bind(pattern.clone());
                query.push(" OR tags LIKE ");
                query.push_bind(pattern);
                query.push(")");
            }
        }
    }
}

/// Turns free text into a safe FTS5 query: each token quoted, implicit AND
/// between tokens, so user input can never be parsed as FTS5 syntax.
fn fts_query(text: &str) -> String {
    text.split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewNote, Visibility};
    use crate::notes::Notes;
    use tempfile::TempDir;

    // the integration tests run against FTS5; this store behaves as if the
    // virtual table never came up, forcing the substring path
    async fn store_without_text_index() -> (TempDir, Store) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(tmp.path()).await.unwrap();

        let notes = Notes::new(&store);
        notes
            .create(NewNote {
                title: "Quantum Mechanics Summary".into(),
                subject: "Physics".into(),
                university: "TU Delft".into(),
                tags: vec!["wave optics".into()],
                owner_id: "alice".into(),
                content_ref: "ref://qm.pdf".into(),
                visibility: Visibility::Public,
            })
            .await
            .unwrap();
        notes
            .create(NewNote {
                title: "Integrals".into(),
                subject: "Math".into(),
                university: "Cambridge".into(),
                tags: vec![],
                owner_id: "alice".into(),
                content_ref: "ref://int.pdf".into(),
                visibility: Visibility::Public,
            })
            .await
            .unwrap();

        let store = Store {
            text_search: false,
            ..store
        };
        (tmp, store)
    }

    #[tokio::test]
    async fn substring_fallback_matches_all_text_fields() {
        let (_tmp, store) = store_without_text_index().await;
        let catalog = Catalog::new(&store);

        let search = |q: &str| ListOptions {
            text_query: Some(q.into()),
            ..Default::default()
        };

        // case-insensitive substring over title, tags, university, subject
        let cases = [
            ("mechan", "Quantum Mechanics Summary"),
            ("WAVE", "Quantum Mechanics Summary"),
            ("cambridge", "Integrals"),
            ("Math", "Integrals"),
        ];
        for (q, title) in cases {
            let page = catalog.list(None, &search(q)).await.unwrap();
            assert_eq!(page.total, 1, "query {q:?}");
            assert_eq!(page.items[0].title, title);
        }

        let page = catalog.list(None, &search("zzz")).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn fts_query_quotes_every_token() {
        assert_eq!(fts_query("rust prog"), "\"rust\" \"prog\"");
        assert_eq!(fts_query("\"unbalanced"), "\"\"\"unbalanced\"");
    }
}
