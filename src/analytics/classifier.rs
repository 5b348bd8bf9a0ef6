//! Product category classification by term matching

use std::collections::BTreeMap;

use crate::config::CategoryDef;

/// Assigns keywords and free text to configured product categories
///
/// Categories are checked in configuration order, so the first category whose
/// term list matches wins when terms overlap (e.g. "candle").
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    categories: Vec<CategoryDef>,
}

impl CategoryClassifier {
    pub fn new(categories: &[CategoryDef]) -> Self {
        let categories = categories
            .iter()
            .map(|def| CategoryDef {
                name: def.name.clone(),
                terms: def.terms.iter().map(|t| t.to_lowercase()).collect(),
            })
            .collect();
        Self { categories }
    }

    /// First category with a term contained in `keyword`
    pub fn classify_keyword(&self, keyword: &str) -> Option<&str> {
        let keyword = keyword.to_lowercase();
        self.categories
            .iter()
            .find(|def| def.terms.iter().any(|term| keyword.contains(term.as_str())))
            .map(|def| def.name.as_str())
    }

    /// Fraction of each category's terms found in `text`; categories without matches are omitted
    pub fn classify_text(&self, text: &str) -> BTreeMap<String, f64> {
        let text = text.to_lowercase();
        self.categories
            .iter()
            .filter(|def| !def.terms.is_empty())
            .filter_map(|def| {
                let matched = def
                    .terms
                    .iter()
                    .filter(|term| text.contains(term.as_str()))
                    .count();
                (matched > 0).then(|| (def.name.clone(), matched as f64 / def.terms.len() as f64))
            })
            .collect()
    }

    pub fn category_keywords(&self, category: &str) -> &[String] {
        self.categories
            .iter()
            .find(|def| def.name == category)
            .map(|def| def.terms.as_slice())
            .unwrap_or(&[])
    }

    pub fn all_categories(&self) -> Vec<&str> {
        self.categories.iter().map(|def| def.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_categories;

    fn classifier() -> CategoryClassifier {
        CategoryClassifier::new(&default_categories())
    }

    #[test]
    fn test_classify_keyword_first_match_wins() {
        let c = classifier();
        // "candle" is listed under both home_decor and wellness
        assert_eq!(c.classify_keyword("Soy Candle"), Some("home_decor"));
        assert_eq!(c.classify_keyword("gold necklace"), Some("jewelry"));
        assert_eq!(c.classify_keyword("handmade gift box"), Some("gifts"));
        assert_eq!(c.classify_keyword("lawnmower"), None);
    }

    #[test]
    fn test_classify_text_scores() {
        let c = classifier();
        let scores = c.classify_text("Vintage retro dog collar");
        assert!((scores["vintage"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((scores["pets"] - 0.25).abs() < 1e-9);
        assert!(!scores.contains_key("jewelry"));
    }

    #[test]
    fn test_category_lookup() {
        let c = classifier();
        assert_eq!(c.all_categories().len(), 8);
        assert_eq!(c.all_categories()[0], "home_decor");
        assert!(c.category_keywords("digital").contains(&"printable".to_string()));
        assert!(c.category_keywords("missing").is_empty());
    }
}
