//! Docker Compose manifest editing.
//!
//! Rewrites the `image:` line of one service block in place. This is a
//! targeted line edit, not a YAML round-trip: comments, ordering, and
//! formatting everywhere else in the manifest are left byte-for-byte intact.

use slipway_core::domain::{Result, ServiceRoot, SlipwayError};

/// Result of an image rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRewrite {
    /// Updated manifest text.
    pub content: String,

    /// Image reference that was in place before the rewrite.
    pub previous: String,

    /// Whether the manifest text changed (false when already at the target).
    pub changed: bool,
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn manifest_error(service: &ServiceRoot, message: impl Into<String>) -> SlipwayError {
    SlipwayError::Deploy {
        service: service.as_str().to_string(),
        message: message.into(),
    }
}

/// Replace the `image:` reference of `service` with `image`.
///
/// The service is located as a block under the top-level `services:` key; its
/// `image:` line keeps its indentation and quoting style. Errors when the
/// manifest has no `services:` key, no block for the service, or a block
/// without an `image:` line. Idempotent: rewriting to the current image
/// returns `changed: false` with identical content.
pub fn rewrite_image(manifest: &str, service: &ServiceRoot, image: &str) -> Result<ImageRewrite> {
    let mut lines: Vec<String> = manifest.lines().map(str::to_string).collect();

    let services_idx = lines
        .iter()
        .position(|line| indent_of(line) == 0 && line.trim_end() == "services:")
        .ok_or_else(|| manifest_error(service, "manifest has no top-level 'services:' key"))?;

    // Locate the service block: `<name>:` indented under `services:`.
    let header = format!("{}:", service.as_str());
    let mut block_start = None;
    for (idx, line) in lines.iter().enumerate().skip(services_idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_of(line);
        if indent == 0 {
            break; // left the services mapping
        }
        if line.trim() == header {
            block_start = Some((idx, indent));
            break;
        }
    }
    let (block_idx, block_indent) = block_start.ok_or_else(|| {
        manifest_error(service, "service has no block under 'services:' in the manifest")
    })?;

    // Find the image line inside the block.
    let mut image_idx = None;
    for (idx, line) in lines.iter().enumerate().skip(block_idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= block_indent {
            break; // next service or next top-level key
        }
        if line.trim_start().starts_with("image:") {
            image_idx = Some(idx);
            break;
        }
    }
    let image_idx = image_idx
        .ok_or_else(|| manifest_error(service, "service block has no 'image:' line"))?;

    let line = &lines[image_idx];
    let key_end = line.find("image:").map(|pos| pos + "image:".len());
    let key_end = match key_end {
        Some(end) => end,
        None => return Err(manifest_error(service, "service block has no 'image:' line")),
    };
    let prefix = line[..key_end].to_string();
    let raw_value = line[key_end..].trim();

    // Preserve the quoting style of the existing value.
    let (previous, replacement) = if raw_value.len() >= 2
        && raw_value.starts_with('"')
        && raw_value.ends_with('"')
    {
        (
            raw_value[1..raw_value.len() - 1].to_string(),
            format!("{prefix} \"{image}\""),
        )
    } else if raw_value.len() >= 2 && raw_value.starts_with('\'') && raw_value.ends_with('\'') {
        (
            raw_value[1..raw_value.len() - 1].to_string(),
            format!("{prefix} '{image}'"),
        )
    } else {
        (raw_value.to_string(), format!("{prefix} {image}"))
    };

    let changed = previous != image;
    if changed {
        lines[image_idx] = replacement;
    }

    let mut content = lines.join("\n");
    if manifest.ends_with('\n') {
        content.push('\n');
    }

    Ok(ImageRewrite {
        content,
        previous,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
# deployed by slipway
services:
  backend:
    image: registry.example.com/acme/backend:1.0.0
    restart: always
    ports:
      - \"8080:8080\"
  frontend:
    image: \"registry.example.com/acme/frontend:1.0.0\"
    depends_on:
      - backend

volumes:
  data: {}
";

    fn root(name: &str) -> ServiceRoot {
        ServiceRoot::new(name).unwrap()
    }

    #[test]
    fn rewrites_only_the_targeted_service() {
        let rewrite = rewrite_image(
            MANIFEST,
            &root("backend"),
            "registry.example.com/acme/backend:2.0.0",
        )
        .unwrap();

        assert!(rewrite.changed);
        assert_eq!(rewrite.previous, "registry.example.com/acme/backend:1.0.0");
        assert!(rewrite
            .content
            .contains("    image: registry.example.com/acme/backend:2.0.0"));
        // Other services, comments and trailing sections untouched.
        assert!(rewrite
            .content
            .contains("image: \"registry.example.com/acme/frontend:1.0.0\""));
        assert!(rewrite.content.starts_with("# deployed by slipway\n"));
        assert!(rewrite.content.ends_with("volumes:\n  data: {}\n"));
    }

    #[test]
    fn preserves_double_quoting_style() {
        let rewrite = rewrite_image(
            MANIFEST,
            &root("frontend"),
            "registry.example.com/acme/frontend:2.0.0",
        )
        .unwrap();

        assert!(rewrite
            .content
            .contains("    image: \"registry.example.com/acme/frontend:2.0.0\""));
    }

    #[test]
    fn rewrite_to_current_image_is_a_no_op() {
        let rewrite = rewrite_image(
            MANIFEST,
            &root("backend"),
            "registry.example.com/acme/backend:1.0.0",
        )
        .unwrap();

        assert!(!rewrite.changed);
        assert_eq!(rewrite.content, MANIFEST);
    }

    #[test]
    fn unknown_service_is_an_error() {
        let err = rewrite_image(MANIFEST, &root("nginx"), "x:1").unwrap_err();
        assert!(err.to_string().contains("nginx"));
    }

    #[test]
    fn service_without_image_line_is_an_error() {
        let manifest = "services:\n  backend:\n    restart: always\n";
        let err = rewrite_image(manifest, &root("backend"), "x:1").unwrap_err();
        assert!(err.to_string().contains("image"));
    }

    #[test]
    fn manifest_without_services_key_is_an_error() {
        let err = rewrite_image("version: '3'\n", &root("backend"), "x:1").unwrap_err();
        assert!(err.to_string().contains("services"));
    }

    #[test]
    fn sibling_top_level_key_named_like_service_does_not_match() {
        // `backend:` under `volumes:`, not under `services:`.
        let manifest = "services:\n  api:\n    image: a:1\nvolumes:\n  backend:\n";
        assert!(rewrite_image(manifest, &root("backend"), "x:1").is_err());
    }
}
