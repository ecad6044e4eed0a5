use std::io::Write;

use crate::{
    domain::{ChannelHandle, ChannelIdentifier},
    resolver::EntityResolver,
    Result,
};

/// Print whether the source and target channels can be found. Diagnostic only: a missing
/// channel is reported, not returned as an error.
pub async fn check_channels(
    resolver: &EntityResolver,
    source: &ChannelIdentifier,
    target: &ChannelIdentifier,
    out: &mut impl Write,
) -> Result<()> {
    let source_handle = resolver.resolve(source).await;
    let target_handle = resolver.resolve(target).await;

    writeln!(out, "{}", status_line("Source", source, source_handle.as_ref()))?;
    writeln!(out, "{}", status_line("Target", target, target_handle.as_ref()))?;
    Ok(())
}

fn status_line(role: &str, id: &ChannelIdentifier, found: Option<&ChannelHandle>) -> String {
    match found {
        Some(handle) => format!("{role} channel found: {} ({})", handle.title, handle.id),
        None => format!("{role} channel not found: {id}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{channel, FakeTransport};

    #[tokio::test]
    async fn prints_one_line_per_channel() {
        let fake = FakeTransport::with_channels(
            channel(-1001, "News", Some("source")),
            channel(-1002, "Mirror", Some("target")),
        );
        let resolver = EntityResolver::new(Arc::new(fake));
        let mut out = Vec::new();

        check_channels(&resolver, &"@source".into(), &"@target".into(), &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Source channel found: News (-1001)\nTarget channel found: Mirror (-1002)\n"
        );
    }

    #[tokio::test]
    async fn missing_channel_is_reported_not_raised() {
        let fake = FakeTransport::with_channels(
            channel(-1001, "News", Some("source")),
            channel(-1002, "Mirror", Some("target")),
        );
        let resolver = EntityResolver::new(Arc::new(fake));
        let mut out = Vec::new();

        check_channels(&resolver, &"@source".into(), &ChannelIdentifier::Id(42), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("Target channel not found: 42\n"));
    }
}
