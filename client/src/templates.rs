use crate::api::BulkApi;
use crate::error::Result;
use common::{BulkTemplate, TemplateDraft};

/// Templates ordered by name, case-insensitively.
pub async fn list_templates<A: BulkApi>(api: &A) -> Result<Vec<BulkTemplate>> {
    let mut templates = api.list_templates().await?;
    templates.sort_by_key(|t| t.name.to_lowercase());
    Ok(templates)
}

pub async fn create_template<A: BulkApi>(api: &A, draft: &TemplateDraft) -> Result<BulkTemplate> {
    draft.validate()?;
    let template = api.create_template(draft).await?;
    log::info!("Created template {} ({})", template.id, template.name);
    Ok(template)
}

pub async fn update_template<A: BulkApi>(api: &A, id: &str, draft: &TemplateDraft) -> Result<BulkTemplate> {
    draft.validate()?;
    let template = api.update_template(id, draft).await?;
    log::info!("Updated template {}", template.id);
    Ok(template)
}

pub async fn delete_template<A: BulkApi>(api: &A, id: &str) -> Result<()> {
    api.delete_template(id).await?;
    log::info!("Deleted template {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::FakeApi;
    use common::TemplateError;

    #[tokio::test]
    async fn test_invalid_draft_not_sent() {
        let api = FakeApi::default();
        let mut draft = TemplateDraft::new("Landing pages");
        draft.word_count = 20_000;

        let err = create_template(&api, &draft).await.unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::WordCountOutOfRange(20_000))));

        draft.word_count = 1200;
        let template = create_template(&api, &draft).await.unwrap();
        assert_eq!(template.name, "Landing pages");
        assert_eq!(template.word_count, 1200);
    }

    #[tokio::test]
    async fn test_update_keeps_id() {
        let api = FakeApi::default();
        let template = update_template(&api, "tpl-42", &TemplateDraft::new("FAQ hubs")).await.unwrap();
        assert_eq!(template.id, "tpl-42");

        let err = update_template(&api, "tpl-42", &TemplateDraft::new(" ")).await.unwrap_err();
        assert!(err.is_validation());
    }
}
