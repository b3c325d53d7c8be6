use std::fmt;

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{id_param, selectors, text};

selectors! {
    COURSE_LINK = r#"a[href*="/course/view.php?id="]"#,
}

/// A course located on the "my courses" page. Transient: it exists only to
/// carry the matched link to the follow-up course-page fetch.
#[derive(Debug, Clone)]
pub struct Course {
    id: CourseId,
    name: String,
    url: String,
}

impl Course {
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Finds the course link whose visible text contains `name` (case-sensitive,
/// first match in page order).
pub fn find_course(html: &Html, name: &str) -> Result<Course> {
    let link = html
        .select(&COURSE_LINK)
        .find(|link| text(*link).contains(name))
        .ok_or_else(|| Error::NotFound {
            what: format!("course link matching \"{name}\""),
        })?;

    let href = link.value().attr("href").ok_or_else(|| Error::Structure {
        target: "course link href".to_owned(),
    })?;
    let id = id_param(href).ok_or_else(|| Error::Structure {
        target: "course id in link".to_owned(),
    })?;

    Ok(Course {
        id: CourseId::new(id.to_owned()),
        name: text(link).trim().to_owned(),
        url: href.to_owned(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId {
    id: String,
}

impl CourseId {
    pub fn new(id: String) -> Self {
        Self { id }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.id.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURSES_PAGE: &str = r#"
        <html><body>
            <a href="/course/index.php">All courses</a>
            <a href="/course/view.php?id=41">Operating Systems</a>
            <a href="/course/view.php?id=42">Intro to Testing</a>
        </body></html>
    "#;

    #[test]
    fn finds_first_link_containing_name() {
        let html = Html::parse_document(COURSES_PAGE);
        let course = find_course(&html, "Testing").unwrap();
        assert_eq!(course.id().as_str(), "42");
        assert_eq!(course.name(), "Intro to Testing");
        assert_eq!(course.url(), "/course/view.php?id=42");
    }

    #[test]
    fn match_is_case_sensitive() {
        let html = Html::parse_document(COURSES_PAGE);
        assert!(matches!(
            find_course(&html, "testing"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn no_matching_link_is_not_found() {
        let html = Html::parse_document("<html><body><p>empty</p></body></html>");
        assert!(matches!(
            find_course(&html, "Testing"),
            Err(Error::NotFound { .. })
        ));
    }
}
