//! Buckets ranked hits into the four result groups a client renders
//! separately: things you navigate straight to, domain records, knowledge
//! base content, and everything else.

use spotlight_core::{SearchHit, SearchResponse};

#[derive(Debug, Default, Clone, Copy)]
pub struct Grouper;

impl Grouper {
    pub fn new() -> Self {
        Self
    }

    /// Splits already-ranked hits into `SearchResponse`'s four buckets by
    /// the trimmed, lowercased `entity_type`, preserving each hit's
    /// relative rank order within its bucket.
    pub fn group(&self, hits: Vec<SearchHit>) -> SearchResponse {
        let mut response = SearchResponse::default();

        for hit in hits {
            match classify(&hit.document.entity_type) {
                Bucket::Navigate => response.navigate.push(hit),
                Bucket::Data => response.data.push(hit),
                Bucket::Knowledge => response.knowledge.push(hit),
                Bucket::Other => response.other.push(hit),
            }
        }

        response
    }
}

enum Bucket {
    Navigate,
    Data,
    Knowledge,
    Other,
}

fn classify(entity_type: &str) -> Bucket {
    match entity_type.trim().to_lowercase().as_str() {
        "route" | "page" | "navigation" | "quick_link" => Bucket::Navigate,
        "knowledge" | "kb" | "doc" | "docs" => Bucket::Knowledge,
        "user" | "group" | "role" | "client" | "project" | "order" | "report" => Bucket::Data,
        _ => Bucket::Other,
    }
}
