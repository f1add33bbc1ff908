//! Tantivy-based search index for the user directory.
//!
//! Provides full-text search over members with field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Role, User};

/// Field boosts: handles and names outrank free text.
const BOOST_USER_NAME: f32 = 10.0;
const BOOST_FULL_NAME: f32 = 8.0;
const BOOST_RANK: f32 = 4.0;
const BOOST_SKILLS: f32 = 4.0;
const BOOST_DESCRIPTION: f32 = 2.5;

/// Search result with user ID and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub user_id: String,
    pub score: f32,
}

/// One page of hits and the number of documents matching overall.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

/// Search index schema fields.
struct SearchFields {
    user_id: Field,
    role: Field,
    user_name: Field,
    full_name: Field,
    rank: Field,
    skills: Field,
    description: Field,
}

/// Tantivy search index for lab members.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    ///
    /// An index written with an older schema is discarded; it is rebuilt from
    /// SQLite at startup anyway.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        // Raw, indexed id so documents can be replaced by term
        let user_id = schema_builder.add_text_field("user_id", STRING | STORED);
        let role = schema_builder.add_text_field("role", STRING);
        let user_name = schema_builder.add_text_field("user_name", TEXT);
        let full_name = schema_builder.add_text_field("full_name", TEXT);
        let rank = schema_builder.add_text_field("rank", TEXT);
        let skills = schema_builder.add_text_field("skills", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            user_id,
            role,
            user_name,
            full_name,
            rank,
            skills,
            description,
        };

        let index = match Index::open_in_dir(index_path) {
            Ok(existing) if existing.schema() == schema => existing,
            Ok(_) => {
                tracing::warn!("Search index schema changed, recreating {:?}", index_path);
                std::fs::remove_dir_all(index_path)
                    .and_then(|_| std::fs::create_dir_all(index_path))
                    .map_err(|e| AppError::Search(format!("Failed to reset index directory: {}", e)))?;
                Index::create_in_dir(index_path, schema.clone())
                    .map_err(|e| AppError::Search(format!("Failed to create index: {}", e)))?
            }
            Err(_) => Index::create_in_dir(index_path, schema.clone())
                .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?,
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from the user table.
    pub async fn rebuild(&self, users: &[User]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for user in users {
            writer.add_document(self.create_document(user))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("User index rebuilt with {} members", users.len());
        Ok(())
    }

    /// Index or re-index a single user.
    pub async fn index_user(&self, user: &User) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = Term::from_field_text(self.fields.user_id, &user.id);
        writer.delete_term(term);
        writer.add_document(self.create_document(user))?;
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Remove a user from the index.
    pub async fn remove_user(&self, user_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = Term::from_field_text(self.fields.user_id, user_id);
        writer.delete_term(term);
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Search for users matching the query, optionally within one role.
    ///
    /// The role is part of the query, so `total` counts every match and not
    /// only the returned page.
    pub fn search(
        &self,
        query_str: &str,
        role: Option<Role>,
        limit: usize,
        offset: usize,
    ) -> Result<SearchPage, AppError> {
        if query_str.trim().is_empty() {
            return Ok(SearchPage::default());
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.user_name,
                self.fields.full_name,
                self.fields.rank,
                self.fields.skills,
                self.fields.description,
            ],
        );

        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let field_queries = [
            (self.fields.user_name, BOOST_USER_NAME),
            (self.fields.full_name, BOOST_FULL_NAME),
            (self.fields.rank, BOOST_RANK),
            (self.fields.skills, BOOST_SKILLS),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let text_query: Box<dyn Query> = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let combined_query: Box<dyn Query> = match role {
            Some(role) => {
                let role_term = Term::from_field_text(self.fields.role, role.as_str());
                let role_query: Box<dyn Query> =
                    Box::new(TermQuery::new(role_term, IndexRecordOption::Basic));
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, text_query),
                    (Occur::Must, role_query),
                ]))
            }
            None => text_query,
        };

        // TopDocs needs a non-zero window and allocates it up front
        let window = limit
            .saturating_add(offset)
            .min(searcher.num_docs() as usize);
        if limit == 0 || offset >= window {
            let total = searcher
                .search(&combined_query, &Count)
                .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;
            return Ok(SearchPage {
                results: Vec::new(),
                total,
            });
        }

        let (top_docs, total) = searcher
            .search(
                &combined_query,
                &(TopDocs::with_limit(window), Count),
            )
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let user_id = doc.get_first(self.fields.user_id)?.as_str()?.to_string();
                Some(SearchResult { user_id, score })
            })
            .collect();

        Ok(SearchPage { results, total })
    }

    fn create_document(&self, user: &User) -> TantivyDocument {
        // Both the raw rank and its label, so "fyp" and "fypstudent" both hit
        let rank = user
            .rank
            .map(|r| format!("{} {} {}", r.as_str(), r.label(), user.role.as_str()))
            .unwrap_or_else(|| user.role.as_str().to_string());

        doc!(
            self.fields.user_id => user.id.clone(),
            self.fields.role => user.role.as_str(),
            self.fields.user_name => user.user_name.clone(),
            self.fields.full_name => user.full_name(),
            self.fields.rank => rank,
            self.fields.skills => user.skills.join(" "),
            self.fields.description => user.description.clone()
        )
    }
}
