use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;
use dockfix_edit::text::find_word;
use dockfix_resolver::ImageRef;
use dockfix_types::Lookup;
use tracing::debug;

/// DL3006: `FROM` without an explicit tag.
///
/// The tag sharing a digest with `latest` is preferred; otherwise the newest
/// tag pushed before the reference date.
pub struct BaseImageTag;

impl BaseImageTag {
    const CODE: &'static str = "DL3006";
}

impl Strategy for BaseImageTag {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Always tag the version of an image explicitly",
            changes_layout: false,
            needs_registry: true,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["FROM"], "a FROM instruction")?;
        let image = cmd.from_image().unwrap_or_default().to_string();
        let reference = ImageRef::parse(&image);

        if reference.is_pinned() {
            return Ok(FixOutcome::Unchanged(format!("{image} is already pinned")));
        }
        if image.contains('$') || image.eq_ignore_ascii_case("scratch") {
            return Ok(FixOutcome::Unchanged(format!("{image} cannot be tagged")));
        }
        let is_stage = doc
            .current_commands()?
            .range(..cmd.start_line)
            .any(|(_, c)| c.stage_name().is_some_and(|s| s.eq_ignore_ascii_case(&image)));
        if is_stage {
            return Ok(FixOutcome::Unchanged(format!("{image} is a build stage")));
        }

        let as_of = doc.reference_date();
        let tag = match ctx
            .resolver
            .latest_tag(&image)
            .or_else_not_found(|| ctx.resolver.tag_as_of(&image, as_of))
        {
            Lookup::Found(tag) => tag,
            Lookup::NotFound => {
                return Err(StrategyError::Unresolved {
                    code: Self::CODE,
                    line,
                    reason: format!("no concrete tag found for {image}"),
                });
            }
            Lookup::Unavailable(reason) => {
                return Err(StrategyError::Unresolved {
                    code: Self::CODE,
                    line,
                    reason,
                });
            }
        };

        let pinned = reference.with_tag(&tag);
        for l in cmd.lines() {
            let text = doc.line(l).unwrap_or_default();
            if let Some(pos) = find_word(text, &image, 0) {
                let updated = format!("{}{}{}", &text[..pos], pinned, &text[pos + image.len()..]);
                doc.set_line(l, updated)?;
                debug!(%image, %pinned, "tagged base image");
                return Ok(FixOutcome::Applied);
            }
        }
        Err(StrategyError::PatternMismatch {
            code: Self::CODE,
            line,
            expected: "the image name on the FROM lines",
        })
    }
}
