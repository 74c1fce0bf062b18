//! robots.txt parsing into per-agent [`RobotsDecision`]s.
//!
//! The body is split on `User-agent:` (any case). The text before the first
//! occurrence is discarded. Each remaining segment is one block: its first
//! line names the agent and the following lines are `Name: Value` directives.
//! Only `Allow` and `Disallow` are recognized.
//!
//! Consecutive `User-agent:` lines with no directives between them form one
//! group and share the rules of the block that follows.

use std::sync::LazyLock;

use metafetch_core::{Pattern, RobotsDecision};
use regex::Regex;

static AGENT_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)user-agent:").expect("invalid regex"));

#[derive(Debug, Default)]
struct Block {
    agent: String,
    allow: Vec<String>,
    disallow: Vec<String>,
    has_directives: bool,
}

/// Parse `body` into one decision per block.
///
/// With `user_agent` set, only blocks whose agent pattern matches it are
/// returned; document order is preserved either way.
///
/// # Errors
///
/// Returns the regex error if a compiled pattern exceeds the regex size limit.
pub fn parse(body: &str, user_agent: Option<&str>) -> Result<Vec<RobotsDecision>, regex::Error> {
    let mut blocks: Vec<Block> = AGENT_SPLIT.split(body).skip(1).filter_map(parse_block).collect();

    // Share rules backwards across a run of agent-only lines.
    for i in (0..blocks.len().saturating_sub(1)).rev() {
        if !blocks[i].has_directives {
            let (head, tail) = blocks.split_at_mut(i + 1);
            head[i].allow = tail[0].allow.clone();
            head[i].disallow = tail[0].disallow.clone();
            head[i].has_directives = tail[0].has_directives;
        }
    }

    let mut decisions = Vec::with_capacity(blocks.len());
    for block in blocks {
        let decision = RobotsDecision {
            user_agent: Pattern::new(&agent_pattern(&block.agent))?,
            allow: combine(&block.allow)?,
            disallow: combine(&block.disallow)?,
            is_synthetic: false,
        };

        if user_agent.is_none_or(|ua| decision.user_agent.is_match(ua)) {
            decisions.push(decision);
        }
    }

    Ok(decisions)
}

fn parse_block(segment: &str) -> Option<Block> {
    let mut lines = segment.lines();
    let agent = strip_comment(lines.next()?);
    if agent.is_empty() {
        return None;
    }

    let mut block = Block { agent: agent.to_string(), ..Default::default() };

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        block.has_directives = true;

        let value = strip_comment(value);
        if value.is_empty() {
            continue;
        }
        let value = if value.starts_with('/') { value.to_string() } else { format!("/{value}") };

        match name.trim().to_ascii_lowercase().as_str() {
            "allow" => block.allow.push(value),
            "disallow" => block.disallow.push(value),
            _ => {}
        }
    }

    Some(block)
}

fn strip_comment(value: &str) -> &str {
    match value.find('#') {
        Some(pos) => value[..pos].trim(),
        None => value.trim(),
    }
}

/// Case-insensitive prefix match where `*` matches anything.
fn agent_pattern(agent: &str) -> String {
    format!("(?i)^{}", regex::escape(agent).replace(r"\*", ".*"))
}

/// Translate one path value: `*` matches any sequence, a trailing `$`
/// anchors the end, everything else is literal.
fn path_pattern(value: &str) -> String {
    let (body, anchored) = match value.strip_suffix('$') {
        Some(body) => (body, true),
        None => (value, false),
    };
    let mut pattern = regex::escape(body).replace(r"\*", ".*");
    if anchored {
        pattern.push('$');
    }
    pattern
}

fn combine(values: &[String]) -> Result<Option<Pattern>, regex::Error> {
    if values.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = values.iter().map(|v| path_pattern(v)).collect();
    Pattern::new(&format!("^(?:{})", alternatives.join("|"))).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "metafetch/0.1 (+https://github.com/metafetch/metafetch)";

    fn only(body: &str) -> RobotsDecision {
        let mut decisions = parse(body, None).unwrap();
        assert_eq!(decisions.len(), 1, "{decisions:?}");
        decisions.remove(0)
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let d = only("User-agent: *\nDisallow: /a\nAllow: /a/b\n");
        assert!(d.is_allowed("/a/b/c"));
        assert!(!d.is_allowed("/a/x"));
        assert!(d.is_allowed("/other"));
        assert!(!d.is_synthetic);
    }

    #[test]
    fn test_preamble_and_comments_ignored() {
        let body = "# robots for example.com\nSitemap: https://example.com/sitemap.xml\n\n\
                    User-agent: * # everyone\n# Disallow: /commented\nDisallow: /private # keep out\nCrawl-delay: 10\n";
        let d = only(body);
        assert_eq!(d.disallow.as_ref().unwrap().as_str(), "^(?:/private)");
        assert!(d.allow.is_none());
        assert!(d.is_allowed("/commented"));
    }

    #[test]
    fn test_empty_values_skipped_and_slash_prefixed() {
        let d = only("User-agent: *\nDisallow:\nAllow: #nothing\nDisallow: tmp\n");
        assert!(d.allow.is_none());
        assert_eq!(d.disallow.as_ref().unwrap().as_str(), "^(?:/tmp)");
    }

    #[test]
    fn test_wildcards_and_end_anchor() {
        let d = only("User-agent: *\nDisallow: /*.pdf$\nDisallow: /search?q=*\n");
        assert!(!d.is_allowed("/docs/file.pdf"));
        assert!(d.is_allowed("/docs/file.pdf.html"));
        assert!(!d.is_allowed("/search?q=rust"));
        assert!(d.is_allowed("/search"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let d = only("User-agent: *\nDisallow: /a.b+c\n");
        assert!(!d.is_allowed("/a.b+c/d"));
        assert!(d.is_allowed("/axb+c"));
    }

    #[test]
    fn test_directive_names_case_insensitive() {
        let d = only("user-agent: *\nDISALLOW: /x\nallow: /x/y\n");
        assert!(!d.is_allowed("/x"));
        assert!(d.is_allowed("/x/y"));
    }

    #[test]
    fn test_filters_by_user_agent() {
        let body = "User-agent: Googlebot\nDisallow: /g\n\nUser-agent: metafetch\nDisallow: /m\n\nUser-agent: *\nDisallow: /all\n";
        assert_eq!(parse(body, None).unwrap().len(), 3);

        let matching = parse(body, Some(UA)).unwrap();
        assert_eq!(matching.len(), 2);
        assert_eq!(matching[0].disallow.as_ref().unwrap().as_str(), "^(?:/m)");
        assert_eq!(matching[1].disallow.as_ref().unwrap().as_str(), "^(?:/all)");

        assert!(parse(body, Some("Bingbot")).unwrap().iter().all(|d| d.user_agent.as_str() == "(?i)^.*"));
    }

    #[test]
    fn test_grouped_agents_share_rules() {
        let body = "User-agent: a\nUser-agent: b\nDisallow: /shared\n";
        let decisions = parse(body, None).unwrap();
        assert_eq!(decisions.len(), 2);
        assert!(decisions.iter().all(|d| !d.is_allowed("/shared/page")));
    }

    #[test]
    fn test_commented_agent_line_drops_block() {
        let decisions = parse("User-agent: # nobody\nDisallow: /\n", None).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_no_blocks() {
        assert!(parse("", Some(UA)).unwrap().is_empty());
        assert!(parse("Disallow: /\n", Some(UA)).unwrap().is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let d = only("User-agent: *\r\nDisallow: /a\r\nAllow: /a/b\r\n");
        assert!(!d.is_allowed("/a"));
        assert!(d.is_allowed("/a/b"));
    }
}
