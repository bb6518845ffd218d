//! Naming helpers: pluralization, model classification, foreign keys

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Pluralize a word ("tweet" -> "tweets", "person" -> "people")
pub fn pluralize(word: &str) -> String {
    pluralizer::pluralize(word, 2, false)
}

/// Singularize a word ("tweets" -> "tweet")
pub fn singularize(word: &str) -> String {
    pluralizer::pluralize(word, 1, false)
}

/// Derive a model name from a path name ("tweets" -> "Tweet")
pub fn classify(path: &str) -> String {
    singularize(path).to_upper_camel_case()
}

/// Default foreign-key field for a model ("User" -> "user")
pub fn foreign_key(model: &str) -> String {
    model.to_snake_case()
}

/// Collection name for a model ("VideoPost" -> "video_posts")
pub fn collection_name(model: &str) -> String {
    pluralize(&model.to_snake_case())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("tweet"), "tweets");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("person"), "people");
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("tweets"), "Tweet");
        assert_eq!(classify("categories"), "Category");
        assert_eq!(classify("User"), "User");
        assert_eq!(classify("venues"), "Venue");
    }

    #[test]
    fn test_foreign_key_and_collection() {
        assert_eq!(foreign_key("User"), "user");
        assert_eq!(foreign_key("VideoPost"), "video_post");
        assert_eq!(collection_name("VideoPost"), "video_posts");
        assert_eq!(collection_name("Category"), "categories");
    }
}
