use std::fmt;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{id_param, selectors, stripped_text, text_lines};

selectors! {
    ASSIGNMENT_LINK = r#"a[href*="/assign/view.php?id="]"#,
    INSTANCE_NAME = "span.instancename",
    REQUIREMENTS = "#intro .no-overflow",
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    id: AssignmentId,
    name: AssignmentName,
}

impl Assignment {
    pub fn new(id: AssignmentId, name: AssignmentName) -> Self {
        Self { id, name }
    }

    pub fn id(&self) -> &AssignmentId {
        &self.id
    }

    pub fn name(&self) -> &AssignmentName {
        &self.name
    }
}

/// All assignment links on a course page, in page order. A link without the
/// labeled instance-name span contributes nothing to the result; course pages
/// mix activity markup enough that this is a tolerance, not an error.
pub fn assignment_links(html: &Html) -> Vec<Assignment> {
    html.select(&ASSIGNMENT_LINK)
        .filter_map(parse_assignment_link)
        .collect()
}

fn parse_assignment_link(link: ElementRef) -> Option<Assignment> {
    let id = id_param(link.value().attr("href")?)?;
    let name = link.select(&INSTANCE_NAME).next()?;

    Some(Assignment::new(
        AssignmentId::new(id.to_owned()),
        AssignmentName::new(stripped_text(name)),
    ))
}

/// The assignment's description region. Mandatory: the scoring pipeline has
/// nothing to grade against without it.
pub fn requirements_text(html: &Html) -> Result<String> {
    let block = html
        .select(&REQUIREMENTS)
        .next()
        .ok_or_else(|| Error::Structure {
            target: "assignment requirements block (#intro .no-overflow)".to_owned(),
        })?;

    Ok(text_lines(block))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId {
    id: String,
}

impl AssignmentId {
    pub fn new(id: String) -> Self {
        Self { id }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.id.fmt(f)
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentName {
    name: String,
}

impl AssignmentName {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AssignmentName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.name.fmt(f)
    }
}
