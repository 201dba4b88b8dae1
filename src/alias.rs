//! Index alias resolution.

/// Maps the index names the host uses to the names stored in the backend.
///
/// Names are lower-cased, and when an environment is configured it is appended
/// as a suffix so several environments can share one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAliasResolver {
    environment: Option<String>,
}

impl IndexAliasResolver {
    pub fn new(environment: Option<String>) -> Self {
        let environment = environment
            .map(|environment| environment.trim().to_string())
            .filter(|environment| !environment.is_empty());
        IndexAliasResolver { environment }
    }

    pub fn resolve(&self, index: &str) -> String {
        match &self.environment {
            Some(environment) => format!("{index}_{environment}").to_lowercase(),
            None => index.to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_without_environment() {
        let resolver = IndexAliasResolver::default();
        assert_eq!(resolver.resolve("Products"), "products");
    }

    #[test]
    fn test_resolve_with_environment() {
        let resolver = IndexAliasResolver::new(Some("Staging".to_string()));
        assert_eq!(resolver.resolve("Products"), "products_staging");

        let blank = IndexAliasResolver::new(Some("  ".to_string()));
        assert_eq!(blank.resolve("Products"), "products");
    }
}
