use scraper::{ElementRef, Html};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{StudentId, StudentName};
use crate::util::{selectors, text};

selectors! {
    GRADING_ROW = r#"tr[id*="mod_assign_grading"]"#,
    STUDENT_LINK = r#"a[href*="/user/"][id*="action"]"#,
    SUBMITTED_STATUS = r#"div[class="submissionstatussubmitted"]"#,
    QUICKGRADE = r#"input[class*="quickgrade"]"#,
    FILE_LINK = r#"a[target="_blank"]"#,
}

/// A file attached to a submission row, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAttachment {
    pub filename: String,
    pub url: String,
}

/// One grading-table row: student identity, grading state, the quick-grade
/// value, and attached files.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    #[serde(rename = "id")]
    student_id: StudentId,
    #[serde(rename = "name")]
    student_name: StudentName,
    // Computed from the row but not part of any caller-facing response.
    #[serde(skip)]
    graded: bool,
    #[serde(rename = "score")]
    quick_grade: String,
    files: Vec<FileAttachment>,
}

impl Submission {
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn student_name(&self) -> &StudentName {
        &self.student_name
    }

    pub fn graded(&self) -> bool {
        self.graded
    }

    pub fn quick_grade(&self) -> &str {
        &self.quick_grade
    }

    pub fn files(&self) -> &[FileAttachment] {
        &self.files
    }

    /// URL of the first attachment when it qualifies for automated content
    /// retrieval. The gate is a filename-substring heuristic keyed to the
    /// cpp programming-assignment convention, not content-type sniffing.
    pub fn answer_url(&self) -> Option<&str> {
        self.files
            .first()
            .filter(|file| file.url.contains("cpp"))
            .map(|file| file.url.as_str())
    }

    pub fn into_student(self) -> (StudentId, StudentName) {
        (self.student_id, self.student_name)
    }
}

/// Resolves every grading-table row on the page, in page order.
pub fn submissions(html: &Html) -> Result<Vec<Submission>> {
    html.select(&GRADING_ROW)
        .enumerate()
        .map(|(row, el)| resolve_row(row, el))
        .collect()
}

fn resolve_row(row: usize, el: ElementRef) -> Result<Submission> {
    let student = el
        .select(&STUDENT_LINK)
        .next()
        .ok_or(Error::MalformedRow {
            row,
            missing: "student link",
        })?;
    let label = text(student);
    let mut tokens: Vec<&str> = label.split_whitespace().collect();
    let student_id = tokens.pop().ok_or(Error::MalformedRow {
        row,
        missing: "student label",
    })?;
    let student_name = tokens.join(" ");

    // "Submitted for grading" without a grade yet shows this marker.
    let graded = el.select(&SUBMITTED_STATUS).next().is_none();

    let quick_grade = el
        .select(&QUICKGRADE)
        .next()
        .ok_or(Error::MalformedRow {
            row,
            missing: "quickgrade input",
        })?
        .value()
        .attr("value")
        .unwrap_or_default();
    // Both branches currently collapse to "0": empty quick grades are zeroed
    // and non-empty ones are zeroed as well.
    // TODO: confirm whether a non-empty quick grade should pass through
    // instead of being replaced.
    let quick_grade = if quick_grade.is_empty() {
        "0".to_owned()
    } else {
        "0".to_owned()
    };

    let files = el
        .select(&FILE_LINK)
        .map(|file| FileAttachment {
            filename: text(file),
            url: file.value().attr("href").unwrap_or_default().to_owned(),
        })
        .collect();

    Ok(Submission {
        student_id: StudentId::new(student_id.to_owned()),
        student_name: StudentName::new(student_name),
        graded,
        quick_grade,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grading_page(rows: &str) -> Html {
        Html::parse_document(&format!(
            "<html><body><table>{rows}</table></body></html>"
        ))
    }

    const FULL_ROW: &str = r#"
        <tr id="mod_assign_grading_r0">
            <td><a href="/user/view.php?id=7" id="user_action_7">Jane Doe 12345</a></td>
            <td><input class="quickgrade" value=""/></td>
            <td>
                <a target="_blank" href="/pluginfile.php/1/answer.cpp">answer.cpp</a>
                <a target="_blank" href="/pluginfile.php/1/notes.txt">notes.txt</a>
            </td>
        </tr>
    "#;

    #[test]
    fn resolves_identity_grade_and_files() {
        let html = grading_page(FULL_ROW);
        let submissions = submissions(&html).unwrap();
        assert_eq!(submissions.len(), 1);

        let submission = &submissions[0];
        assert_eq!(submission.student_id().as_str(), "12345");
        assert_eq!(submission.student_name().as_str(), "Jane Doe");
        assert!(submission.graded());
        assert_eq!(submission.quick_grade(), "0");
        assert_eq!(
            submission.files(),
            &[
                FileAttachment {
                    filename: "answer.cpp".to_owned(),
                    url: "/pluginfile.php/1/answer.cpp".to_owned(),
                },
                FileAttachment {
                    filename: "notes.txt".to_owned(),
                    url: "/pluginfile.php/1/notes.txt".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn quick_grade_is_zero_even_when_input_has_a_value() {
        let html = grading_page(
            r#"<tr id="mod_assign_grading_r0">
                <td><a href="/user/view.php?id=7" id="user_action_7">Jane Doe 12345</a></td>
                <td><input class="quickgrade" value="87"/></td>
            </tr>"#,
        );

        let submissions = submissions(&html).unwrap();
        assert_eq!(submissions[0].quick_grade(), "0");
    }

    #[test]
    fn submitted_marker_flips_graded_and_nothing_else() {
        let with_marker = grading_page(
            r#"<tr id="mod_assign_grading_r0">
                <td><a href="/user/view.php?id=7" id="user_action_7">Jane Doe 12345</a></td>
                <td><div class="submissionstatussubmitted">Submitted for grading</div></td>
                <td><input class="quickgrade" value=""/></td>
            </tr>"#,
        );

        let marked = submissions(&with_marker).unwrap();
        let ungraded = &marked[0];
        assert!(!ungraded.graded());

        let unmarked = submissions(&grading_page(FULL_ROW)).unwrap();
        let graded = &unmarked[0];
        assert!(graded.graded());
        assert_eq!(ungraded.student_id(), graded.student_id());
        assert_eq!(ungraded.student_name(), graded.student_name());
        assert_eq!(ungraded.quick_grade(), graded.quick_grade());
    }

    #[test]
    fn row_without_student_link_is_malformed() {
        let html = grading_page(
            r#"<tr id="mod_assign_grading_r0">
                <td><input class="quickgrade" value=""/></td>
            </tr>"#,
        );

        assert!(matches!(
            submissions(&html),
            Err(Error::MalformedRow {
                row: 0,
                missing: "student link",
            })
        ));
    }

    #[test]
    fn row_without_quickgrade_input_is_malformed() {
        let html = grading_page(
            r#"<tr id="mod_assign_grading_r0">
                <td><a href="/user/view.php?id=7" id="user_action_7">Jane Doe 12345</a></td>
            </tr>"#,
        );

        assert!(matches!(
            submissions(&html),
            Err(Error::MalformedRow {
                row: 0,
                missing: "quickgrade input",
            })
        ));
    }

    #[test]
    fn no_attachments_is_an_empty_list() {
        let html = grading_page(
            r#"<tr id="mod_assign_grading_r0">
                <td><a href="/user/view.php?id=7" id="user_action_7">Jane Doe 12345</a></td>
                <td><input class="quickgrade" value=""/></td>
            </tr>"#,
        );

        let resolved = submissions(&html).unwrap();
        let submission = &resolved[0];
        assert!(submission.files().is_empty());
        assert_eq!(submission.answer_url(), None);
    }

    #[test]
    fn answer_gate_looks_only_at_the_first_file() {
        let html = grading_page(
            r#"<tr id="mod_assign_grading_r0">
                <td><a href="/user/view.php?id=7" id="user_action_7">Jane Doe 12345</a></td>
                <td><input class="quickgrade" value=""/></td>
                <td>
                    <a target="_blank" href="/pluginfile.php/1/report.pdf">report.pdf</a>
                    <a target="_blank" href="/pluginfile.php/1/answer.cpp">answer.cpp</a>
                </td>
            </tr>"#,
        );

        assert_eq!(submissions(&html).unwrap()[0].answer_url(), None);
    }
}
