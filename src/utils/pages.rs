use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageRangeError {
  #[error("Invalid page range: {0}")]
  Invalid(String),
}

fn parse_number(part: &str, value: &str) -> Result<i64, PageRangeError> {
  value
    .parse::<i64>()
    .map_err(|_| PageRangeError::Invalid(part.to_owned()))
}

/// # Parse page ranges
/// Parse a selection like `1-3,5` against a document of `page_count` pages.
/// Ranges are clamped to the document, single pages out of it are dropped.
/// An empty selection means every page.
///
/// # Return
/// Sorted and deduplicated 1-based page numbers
pub fn parse_page_ranges(
  selection: &str,
  page_count: u32,
) -> Result<Vec<u32>, PageRangeError> {
  let selection: String =
    selection.chars().filter(|c| !c.is_whitespace()).collect();
  let max = i64::from(page_count);
  if selection.is_empty() {
    return Ok((1..=page_count).collect());
  }
  let mut pages = Vec::new();
  for part in selection.split(',') {
    if part.is_empty() {
      continue;
    }
    if let Some((start, end)) = part.split_once('-') {
      let start = parse_number(part, start)?.max(1);
      let end = parse_number(part, end)?.min(max);
      pages.extend((start..=end).map(|page| page as u32));
    } else {
      let page = parse_number(part, part)?;
      if (1..=max).contains(&page) {
        pages.push(page as u32);
      }
    }
  }
  pages.sort_unstable();
  pages.dedup();
  Ok(pages)
}
