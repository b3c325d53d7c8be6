use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://moodle.nhu.edu.tw";
pub const COURSES_PATH: &str = "/my/courses.php";

macro_rules! selectors {
    ($name:ident = $x:expr $(,)?) => {
        lazy_static::lazy_static! { static ref $name: scraper::Selector = scraper::Selector::parse($x).unwrap(); }
    };

    ($name:ident = $x:expr, $($names:ident = $xs:expr),+ $(,)?) => {
        selectors! { $name = $x }
        selectors! {
            $($names = $xs),+
        }
    };
}
pub(crate) use selectors;

selectors! {
    TITLE = "title",
}

lazy_static! {
    static ref ID_PARAM: Regex = Regex::new(r"id=(\d+)").unwrap();
}

pub fn moodle_url(base: &str, path: &str) -> String {
    format!("{base}{path}")
}

pub fn assignment_path(id: &str) -> String {
    format!("/mod/assign/view.php?id={id}")
}

pub fn grading_path(id: &str) -> String {
    format!("/mod/assign/view.php?id={id}&action=grading")
}

/// Resolves an extracted `href` against the portal base, falling back to
/// plain concatenation when the href is not joinable as a URL.
pub fn absolutize(base: &str, href: &str) -> String {
    Url::parse(base)
        .ok()
        .and_then(|base| base.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| moodle_url(base, href))
}

/// First run of digits following `id=` in a link, the LMS-assigned numeric id.
pub fn id_param(href: &str) -> Option<&str> {
    ID_PARAM
        .captures(href)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
}

pub fn text(el: ElementRef) -> String {
    el.text().flat_map(|text| text.chars()).collect()
}

/// Element text with each text node trimmed, concatenated without separators.
pub fn stripped_text(el: ElementRef) -> String {
    el.text().map(str::trim).collect()
}

/// Element text with internal element boundaries turned into newlines:
/// each non-empty text node is trimmed and the nodes are joined with `\n`.
pub fn text_lines(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn page_title(html: &Html) -> String {
    html.select(&TITLE)
        .next()
        .map(|title| text(title).trim().to_owned())
        .unwrap_or_default()
}
