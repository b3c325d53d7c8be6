use futures::{StreamExt, TryStreamExt, stream};
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, info};

use crate::assignment::{Assignment, AssignmentId, assignment_links, requirements_text};
use crate::course::find_course;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchedPage};
use crate::scoring::{ScoreOutcome, ScoreRequest, ScoreService};
use crate::submission::{Submission, submissions};
use crate::types::{StudentId, StudentName};
use crate::util::{
    COURSES_PATH, DEFAULT_BASE_URL, absolutize, assignment_path, grading_path, moodle_url,
    page_title, stripped_text,
};

/// Assignments of a course, with the course page's status and title for
/// caller diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentList {
    pub status: u16,
    pub title: String,
    pub assignments: Vec<Assignment>,
}

/// Requirements plus resolved submissions of an assignment, without any
/// scoring-service calls.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentInfo {
    pub status: u16,
    pub title: String,
    pub requirements: String,
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub id: StudentId,
    pub name: StudentName,
    pub score: u8,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub url: String,
    pub status_code: u16,
    pub content: String,
    pub title: String,
}

/// Composes fetcher, extractor, resolver, enrichment and scoring into the
/// caller-facing operations. Stateless per invocation: everything is built
/// fresh from the pages fetched during one call.
#[derive(Debug, Clone)]
pub struct Pipeline<F, S> {
    fetcher: F,
    scorer: S,
    base_url: String,
    concurrency: usize,
}

impl<F: Fetch, S: ScoreService> Pipeline<F, S> {
    pub fn new(fetcher: F, scorer: S) -> Self {
        Self {
            fetcher,
            scorer,
            base_url: DEFAULT_BASE_URL.to_owned(),
            concurrency: 1,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// At most this many submissions are scored in flight at once. Results
    /// still come back in page order. Defaults to 1, the strictly
    /// sequential behavior.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[tracing::instrument(skip(self, cookie))]
    pub async fn list_assignments(&self, course: &str, cookie: &str) -> Result<AssignmentList> {
        let courses_page = self
            .fetcher
            .fetch(&moodle_url(&self.base_url, COURSES_PATH), cookie)
            .await?;
        let course = {
            let html = Html::parse_document(&courses_page.body);
            find_course(&html, course)?
        };
        debug!(id = %course.id(), name = course.name(), "matched course");

        let course_page = self
            .fetcher
            .fetch(&absolutize(&self.base_url, course.url()), cookie)
            .await?;
        let html = Html::parse_document(&course_page.body);
        let assignments = assignment_links(&html);
        info!(count = assignments.len(), "extracted assignment links");

        Ok(AssignmentList {
            status: course_page.status,
            title: page_title(&html),
            assignments,
        })
    }

    #[tracing::instrument(skip(self, cookie))]
    pub async fn assignment_info(
        &self,
        assignment: &AssignmentId,
        cookie: &str,
    ) -> Result<AssignmentInfo> {
        let (requirements, grading_page) = self.fetch_assignment_pages(assignment, cookie).await?;

        let html = Html::parse_document(&grading_page.body);
        let submissions = submissions(&html)?;
        info!(count = submissions.len(), "resolved grading rows");

        Ok(AssignmentInfo {
            status: grading_page.status,
            title: page_title(&html),
            requirements,
            submissions,
        })
    }

    #[tracing::instrument(skip(self, cookie))]
    pub async fn score_assignment(
        &self,
        assignment: &AssignmentId,
        cookie: &str,
    ) -> Result<Vec<ScoreResult>> {
        let (requirements, grading_page) = self.fetch_assignment_pages(assignment, cookie).await?;

        let (title, submissions) = {
            let html = Html::parse_document(&grading_page.body);
            (page_title(&html), submissions(&html)?)
        };
        info!(count = submissions.len(), "scoring submissions");

        let results = stream::iter(submissions)
            .map(|submission| self.grade(&title, &requirements, submission, cookie))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(results)
    }

    /// Fetches a page with the session cookie and returns its text content,
    /// optionally narrowed to the elements matching a CSS selector.
    pub async fn crawl(
        &self,
        url: &str,
        selector: Option<&str>,
        cookie: &str,
    ) -> Result<CrawlResult> {
        let page = self.fetcher.fetch(url, cookie).await?;
        let html = Html::parse_document(&page.body);

        let content = match selector {
            Some(selector) => {
                let selector = Selector::parse(selector).map_err(|err| Error::Structure {
                    target: format!("CSS selector \"{selector}\": {err}"),
                })?;
                html.select(&selector)
                    .map(stripped_text)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            None => stripped_text(html.root_element()),
        };

        Ok(CrawlResult {
            url: url.to_owned(),
            status_code: page.status,
            // Bounded so downstream automation callers get a predictable
            // response size; counted in characters, not bytes.
            content: content.chars().take(5000).collect(),
            title: page_title(&html),
        })
    }

    /// The two fetch/extract steps shared by `assignment_info` and
    /// `score_assignment`: the description page (mandatory requirements
    /// block) and the grading page.
    async fn fetch_assignment_pages(
        &self,
        assignment: &AssignmentId,
        cookie: &str,
    ) -> Result<(String, FetchedPage)> {
        let description_page = self
            .fetcher
            .fetch(
                &moodle_url(&self.base_url, &assignment_path(assignment.as_str())),
                cookie,
            )
            .await?;
        let requirements = {
            let html = Html::parse_document(&description_page.body);
            requirements_text(&html)?
        };

        let grading_page = self
            .fetcher
            .fetch(
                &moodle_url(&self.base_url, &grading_path(assignment.as_str())),
                cookie,
            )
            .await?;

        Ok((requirements, grading_page))
    }

    async fn grade(
        &self,
        title: &str,
        requirements: &str,
        submission: Submission,
        cookie: &str,
    ) -> Result<ScoreResult> {
        let outcome = match self.fetch_answer(&submission, cookie).await? {
            Some(answer) => {
                let request = ScoreRequest {
                    title,
                    requirements,
                    answer: &answer,
                };
                ScoreOutcome::Scored(self.scorer.score(&request).await?)
            }
            None => ScoreOutcome::NoEligibleAnswer,
        };

        let (id, name) = submission.into_student();
        let response = outcome.into_response();
        Ok(ScoreResult {
            id,
            name,
            score: response.score,
            reason: response.reason,
        })
    }

    /// `None` means "no eligible answer" and is distinct from an eligible
    /// file with empty content, which still goes to the scoring service.
    async fn fetch_answer(&self, submission: &Submission, cookie: &str) -> Result<Option<String>> {
        let Some(href) = submission.answer_url() else {
            return Ok(None);
        };

        let url = absolutize(&self.base_url, href);
        debug!(%url, student = %submission.student_id(), "fetching answer file");
        let page = self.fetcher.fetch(&url, cookie).await?;
        Ok(Some(page.body))
    }
}
