use anyhow::{Result, bail};

/// Pluggable key derivation.
///
/// `Ok(None)` (or an empty key) hands control back to the default
/// date-based layout, and so does an error.
pub trait KeyGenerator: Send + Sync {
    fn generate(
        &self,
        file_name: &str,
        parent_type: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>>;
}

/// Key generator driven by a `{placeholder}` template.
///
/// Known placeholders: `{file_name}`, `{parent_type}`, `{parent_id}`.
#[derive(Debug, Clone)]
pub struct TemplateKeyGenerator {
    template: String,
}

impl TemplateKeyGenerator {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl KeyGenerator for TemplateKeyGenerator {
    fn generate(
        &self,
        file_name: &str,
        parent_type: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>> {
        let mut key = String::with_capacity(self.template.len() + file_name.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            key.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                bail!("unterminated placeholder in key template '{}'", self.template);
            };

            match &after[..end] {
                "file_name" => key.push_str(file_name),
                "parent_type" => key.push_str(parent_type),
                "parent_id" => match parent_id.filter(|p| !p.is_empty()) {
                    Some(id) => key.push_str(id),
                    None => bail!("file attached to {} has no parent id", parent_type),
                },
                other => bail!("unknown placeholder '{{{}}}' in key template", other),
            }
            rest = &after[end + 1..];
        }
        key.push_str(rest);

        if key.trim_matches('/').is_empty() {
            return Ok(None);
        }
        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_expansion() {
        let generator = TemplateKeyGenerator::new("/uploads/{parent_type}/{parent_id}/{file_name}/");
        let key = generator
            .generate("invoice.pdf", "Sales Invoice", Some("SINV-0001"))
            .unwrap();
        assert_eq!(
            key.as_deref(),
            Some("/uploads/Sales Invoice/SINV-0001/invoice.pdf/")
        );
    }

    #[test]
    fn test_missing_parent_id_is_an_error() {
        let generator = TemplateKeyGenerator::new("{parent_type}/{parent_id}/{file_name}");
        assert!(generator.generate("a.png", "File", None).is_err());
        assert!(generator.generate("a.png", "File", Some("")).is_err());
    }

    #[test]
    fn test_unknown_placeholder_is_an_error() {
        let generator = TemplateKeyGenerator::new("{tenant}/{file_name}");
        let err = generator.generate("a.png", "File", None).unwrap_err();
        assert!(err.to_string().contains("tenant"));
    }

    #[test]
    fn test_unterminated_placeholder_is_an_error() {
        let generator = TemplateKeyGenerator::new("docs/{file_name");
        assert!(generator.generate("a.png", "File", None).is_err());
    }

    #[test]
    fn test_empty_expansion_defers_to_default() {
        let generator = TemplateKeyGenerator::new("//");
        assert_eq!(generator.generate("a.png", "File", None).unwrap(), None);
    }
}
