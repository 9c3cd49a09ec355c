//! Page-selection expressions: `all`, `first`, `last`, `odd`, `even`, or a
//! comma-separated list of 1-based pages and inclusive ranges (`1,3-5`).

use std::collections::BTreeSet;

use log::warn;

/// Resolves a page spec against a document of `total_pages` pages.
///
/// The result is zero-based, deduplicated and ascending. Tokens that do not
/// parse or point outside the document are skipped, not fatal: a typo in one
/// entry of a long list should not abort the batch.
pub fn parse_pages(spec: &str, total_pages: usize) -> Vec<usize> {
    if total_pages == 0 {
        return Vec::new();
    }

    let lowered = spec.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "" | "all" => return (0..total_pages).collect(),
        "first" => return vec![0],
        "last" => return vec![total_pages - 1],
        "odd" => return (0..total_pages).step_by(2).collect(),
        "even" => return (1..total_pages).step_by(2).collect(),
        _ => {}
    }

    let mut selected = BTreeSet::new();
    for token in lowered.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some((start, end)) = token.split_once('-') {
            match (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
                (Ok(a), Ok(b)) => {
                    let lo = a.saturating_sub(1);
                    let hi = b.saturating_sub(1).min(total_pages - 1);
                    if lo > hi {
                        warn!("skipping empty page range '{token}'");
                        continue;
                    }
                    selected.extend(lo..=hi);
                }
                _ => warn!("skipping malformed page range '{token}'"),
            }
        } else {
            match token.parse::<usize>() {
                Ok(n) if (1..=total_pages).contains(&n) => {
                    selected.insert(n - 1);
                }
                Ok(n) => warn!("skipping out-of-range page {n} (document has {total_pages})"),
                Err(_) => warn!("skipping unparseable page token '{token}'"),
            }
        }
    }
    selected.into_iter().collect()
}
