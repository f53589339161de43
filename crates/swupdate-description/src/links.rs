//! Resolution of `ref` links between description nodes.
//!
//! A group may contain `ref = "#./../other"` instead of its own content,
//! pointing at another node. `#./` paths are relative to the node that
//! holds the link; `#/` paths start from the document root.

use crate::libconfig::{join_path, Config, Setting};
use crate::DescriptionError;
use tracing::debug;

/// Maximum number of nodes visited while following links.
pub const MAX_LINKS_DEPTH: u32 = 10;

/// Compute the node path a `ref` value points to, starting from `nodes`.
pub fn resolve_ref<S: AsRef<str>>(
    nodes: &[S],
    reference: &str,
) -> Result<Vec<String>, DescriptionError> {
    let bad = |reason: &str| DescriptionError::BadReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    let path = reference
        .strip_prefix('#')
        .ok_or_else(|| bad("links must start with '#'"))?;

    let (mut resolved, rest): (Vec<String>, &str) = if let Some(rest) = path.strip_prefix("./") {
        (nodes.iter().map(|n| n.as_ref().to_string()).collect(), rest)
    } else if let Some(rest) = path.strip_prefix('/') {
        (Vec::new(), rest)
    } else {
        return Err(bad("links must start with '#./' or '#/'"));
    };

    for token in rest.split('/').filter(|t| !t.is_empty()) {
        match token {
            "." => {}
            ".." => {
                if resolved.pop().is_none() {
                    return Err(bad("path goes above the root"));
                }
            }
            name => resolved.push(name.to_string()),
        }
    }

    if resolved.is_empty() {
        return Err(bad("link resolves to the root"));
    }
    Ok(resolved)
}

/// Find the node at `nodes`, following `ref` links.
///
/// `depth` is decremented before each visit; the search gives up once it
/// reaches zero, which breaks link cycles. Returns the final node path
/// together with the setting.
pub fn find_root<'a, S: AsRef<str>>(
    cfg: &'a Config,
    nodes: &[S],
    depth: u32,
) -> Option<(Vec<String>, &'a Setting)> {
    let depth = depth.saturating_sub(1);
    if depth == 0 {
        debug!("link depth exhausted at {}", join_path(nodes));
        return None;
    }

    let elem = cfg.node(nodes)?;
    if elem.is_group() {
        if let Some(reference) = elem.field_str(Some("ref")) {
            let next = match resolve_ref(nodes, reference) {
                Ok(next) => next,
                Err(e) => {
                    debug!("{}: {}", join_path(nodes), e);
                    return None;
                }
            };
            debug!("following {} -> {}", join_path(nodes), join_path(&next));
            return find_root(cfg, &next, depth);
        }
    }

    let path = nodes.iter().map(|n| n.as_ref().to_string()).collect();
    Some((path, elem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_relative() {
        let nodes = ["software", "board", "stable", "copy1"];
        assert_eq!(
            resolve_ref(&nodes, "#./../copy2").unwrap(),
            vec!["software", "board", "stable", "copy2"]
        );
        assert_eq!(
            resolve_ref(&nodes, "#./../../common/./main").unwrap(),
            vec!["software", "board", "common", "main"]
        );
    }

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(
            resolve_ref(&["a", "b"], "#/software/shared").unwrap(),
            vec!["software", "shared"]
        );
    }

    #[test]
    fn test_resolve_errors() {
        assert!(resolve_ref(&["a"], "./b").is_err());
        assert!(resolve_ref(&["a"], "#b").is_err());
        assert!(resolve_ref(&["a"], "#./../..").is_err());
        assert!(resolve_ref(&["a"], "#./..").is_err());
    }

    #[test]
    fn test_find_root_follows_links() {
        let cfg = Config::parse(
            r##"
            software = {
                stable = {
                    copy1 = { ref = "#./../copy2"; };
                    copy2 = { images = ( { filename = "rootfs"; } ); };
                };
            };
            "##,
        )
        .unwrap();

        let (path, node) =
            find_root(&cfg, &["software", "stable", "copy1"], MAX_LINKS_DEPTH).unwrap();
        assert_eq!(path, vec!["software", "stable", "copy2"]);
        assert!(node.member("images").is_some());

        let (path, _) = find_root(&cfg, &["software", "stable", "copy2"], MAX_LINKS_DEPTH).unwrap();
        assert_eq!(path, vec!["software", "stable", "copy2"]);

        assert!(find_root(&cfg, &["software", "missing"], MAX_LINKS_DEPTH).is_none());
    }

    #[test]
    fn test_find_root_breaks_cycles() {
        let cfg = Config::parse(
            r##"
            software = {
                a = { ref = "#./../b"; };
                b = { ref = "#./../a"; };
            };
            "##,
        )
        .unwrap();
        assert!(find_root(&cfg, &["software", "a"], MAX_LINKS_DEPTH).is_none());
    }

    #[test]
    fn test_find_root_depth_budget() {
        let cfg = Config::parse("software = { x = 1; };").unwrap();
        assert!(find_root(&cfg, &["software"], 1).is_none());
        assert!(find_root(&cfg, &["software"], 2).is_some());
    }
}
