use bollard::models::ContainerInspectResponse;

/// Container identity resolved from an event's actor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,         // Full container ID 64-char hash
    pub name: String,       // Without leading slash; empty if the daemon sent none
    pub image: String,      // Reference from the container config, not the image ID
}

impl From<ContainerInspectResponse> for ContainerInfo {
    fn from(details: ContainerInspectResponse) -> Self {
        // Inspect's top-level `Image` is the resolved sha256 ID; the reference
        // the container was created from lives in Config -> Image.
        let image = details.config
            .and_then(|c| c.image)
            .unwrap_or_default();

        Self {
            id: details.id.unwrap_or_default(),
            name: details.name
                .as_deref()
                .map(normalize_name)
                .unwrap_or_default(),
            image,
        }
    }
}

/// Docker reports container names with a leading `/`.
pub fn normalize_name(raw: &str) -> String {
    raw.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::ContainerConfig;

    #[test]
    fn test_from_inspect_uses_config_image() {
        let details = ContainerInspectResponse {
            id: Some("abc123".to_string()),
            name: Some("/app".to_string()),
            image: Some("sha256:deadbeef".to_string()),
            config: Some(ContainerConfig {
                image: Some("ghcr.io/org/app:latest".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let info = ContainerInfo::from(details);
        assert_eq!(info.id, "abc123");
        assert_eq!(info.name, "app");
        assert_eq!(info.image, "ghcr.io/org/app:latest");
    }

    #[test]
    fn test_from_inspect_missing_fields() {
        let info = ContainerInfo::from(ContainerInspectResponse::default());
        assert!(info.name.is_empty());
        assert!(info.image.is_empty());
    }

    #[test]
    fn test_normalize_name_strips_leading_slash() {
        assert_eq!(normalize_name("/web"), "web");
        assert_eq!(normalize_name("web"), "web");
        assert_eq!(normalize_name("//web"), "web");
    }
}
