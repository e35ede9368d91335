use rusqlite::Connection;
use serde::Serialize;

use crate::scale;
use crate::store::{
    self, Assignment, Course, Criterion, CriterionGrade, Feedback, Group, Student, Submission,
};

#[derive(Debug, Clone, Serialize)]
pub struct ReportError {
    pub code: String,
    pub message: String,
}

impl ReportError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

fn query_failed(e: anyhow::Error) -> ReportError {
    ReportError::new("db_query_failed", e.to_string())
}

/// A criterion-level mark for one (student, course module, criterion)
/// triple. Ungraded covers both "no filling" and "filling without a score";
/// both render blank, never as "N".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriterionMark {
    Ungraded,
    Marked {
        letter: &'static str,
        remark: String,
    },
}

impl CriterionMark {
    pub fn letter(&self) -> &str {
        match self {
            CriterionMark::Ungraded => "",
            CriterionMark::Marked { letter, .. } => letter,
        }
    }

    pub fn remark(&self) -> &str {
        match self {
            CriterionMark::Ungraded => "",
            CriterionMark::Marked { remark, .. } => remark,
        }
    }
}

/// Whole-assignment standing for one student. Distinct from the
/// criterion-level mark: a pair with no submission row at all is "N", a
/// submission awaiting marking is "!".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    NotSubmitted,
    AwaitingMark,
    Graded(i64),
}

impl OverallStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OverallStatus::NotSubmitted => "N",
            OverallStatus::AwaitingMark => "!",
            OverallStatus::Graded(n) => scale::num_to_letter(*n),
        }
    }

    pub fn style(&self) -> &'static str {
        match self {
            OverallStatus::NotSubmitted => "",
            OverallStatus::AwaitingMark => "newsub",
            OverallStatus::Graded(n) => scale::grade_style(scale::num_to_letter(*n)),
        }
    }
}

/// Read-only snapshot of everything one render needs. Populated once at
/// load, then scanned in memory; the store is never touched again for the
/// lifetime of the render.
pub struct ReportSnapshot {
    pub course: Course,
    pub groups: Vec<Group>,
    pub selected_group: Option<i64>,
    pub students: Vec<Student>,
    pub assignments: Vec<Assignment>,
    pub criteria: Vec<Criterion>,
    pub criterion_grades: Vec<CriterionGrade>,
    pub submissions: Vec<Submission>,
    pub feedback: Vec<Feedback>,
    pub min_criteria: Vec<Criterion>,
}

impl ReportSnapshot {
    /// Validates the course before anything else, then runs each read query
    /// exactly once. A missing course is `not_found`; any store failure
    /// aborts the load with `db_query_failed`.
    pub fn load(
        conn: &Connection,
        courseid: i64,
        groupid: Option<i64>,
    ) -> Result<Self, ReportError> {
        let course = store::fetch_course(conn, courseid)
            .map_err(query_failed)?
            .ok_or_else(|| ReportError::new("not_found", "course not found"))?;

        let groups = store::fetch_groups(conn, courseid).map_err(query_failed)?;
        if let Some(gid) = groupid {
            if !groups.iter().any(|g| g.groupid == gid) {
                return Err(ReportError::new("not_found", "group not found in course"));
            }
        }

        let students = store::fetch_students(conn, courseid, groupid).map_err(query_failed)?;
        let assignments = store::fetch_rubric_assignments(conn, courseid).map_err(query_failed)?;
        let criteria = store::fetch_rubric_criteria(conn, courseid).map_err(query_failed)?;
        let criterion_grades =
            store::fetch_criterion_grades(conn, courseid).map_err(query_failed)?;
        let submissions = store::fetch_submissions(conn, courseid).map_err(query_failed)?;
        let feedback = store::fetch_feedback(conn, courseid).map_err(query_failed)?;
        let min_criteria =
            store::fetch_min_criterion_per_assignment(conn, courseid, store::shortname_lexicographic)
                .map_err(query_failed)?;

        Ok(Self {
            course,
            groups,
            selected_group: groupid,
            students,
            assignments,
            criteria,
            criterion_grades,
            submissions,
            feedback,
            min_criteria,
        })
    }

    /// Criteria of one assignment, in authored definition order.
    pub fn criteria_for(&self, coursemoduleid: i64) -> Vec<&Criterion> {
        self.criteria
            .iter()
            .filter(|c| c.coursemoduleid == coursemoduleid)
            .collect()
    }

    pub fn grade_for(&self, userid: i64, coursemoduleid: i64, criteriaid: i64) -> CriterionMark {
        for g in &self.criterion_grades {
            if g.userid == userid && g.coursemoduleid == coursemoduleid && g.criteriaid == criteriaid
            {
                return match g.score {
                    Some(score) => CriterionMark::Marked {
                        letter: scale::criterion_num_to_letter(score),
                        remark: g.remark.clone(),
                    },
                    None => CriterionMark::Ungraded,
                };
            }
        }
        CriterionMark::Ungraded
    }

    pub fn overall_status(&self, userid: i64, assign: &Assignment) -> OverallStatus {
        for s in &self.submissions {
            if s.userid == userid
                && s.coursemoduleid == assign.coursemoduleid
                && s.assignid == assign.assignid
            {
                return match s.grade {
                    Some(grade) => OverallStatus::Graded(grade),
                    None => OverallStatus::AwaitingMark,
                };
            }
        }
        OverallStatus::NotSubmitted
    }

    pub fn feedback_for(&self, assignid: i64, userid: i64) -> Option<&str> {
        self.feedback
            .iter()
            .find(|f| f.assignid == assignid && f.userid == userid)
            .map(|f| f.commenttext.as_str())
    }

    pub fn min_criterion_for(&self, coursemoduleid: i64) -> Option<&Criterion> {
        self.min_criteria
            .iter()
            .find(|c| c.coursemoduleid == coursemoduleid)
    }

    /// Numeric value of the best grade a rubric offers, read off the
    /// minimal criterion's initial letter (D1 sorts below M1 and P1, so the
    /// lexicographic minimum carries the top band).
    pub fn grade_ceiling(&self, coursemoduleid: i64) -> Option<i64> {
        self.min_criterion_for(coursemoduleid)
            .and_then(|c| c.shortname.chars().next())
            .map(scale::letter_to_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(userid: i64, first: &str, last: &str) -> Student {
        Student {
            userid,
            idnumber: String::new(),
            firstname: first.to_string(),
            lastname: last.to_string(),
            username: format!("{}{}", first.to_lowercase(), userid),
        }
    }

    fn criterion(criteriaid: i64, coursemoduleid: i64, shortname: &str) -> Criterion {
        Criterion {
            criteriaid,
            assignid: coursemoduleid,
            coursemoduleid,
            shortname: shortname.to_string(),
        }
    }

    fn snapshot() -> ReportSnapshot {
        let criteria = vec![
            criterion(100, 50, "P1"),
            criterion(101, 50, "M1"),
            criterion(102, 50, "D1"),
        ];
        let min_criteria = store::min_criteria(&criteria, store::shortname_lexicographic);
        ReportSnapshot {
            course: Course {
                id: 1,
                fullname: "Engineering".to_string(),
            },
            groups: Vec::new(),
            selected_group: None,
            students: vec![student(7, "Alice", "Archer"), student(8, "Bob", "Baker")],
            assignments: vec![Assignment {
                assignid: 50,
                coursemoduleid: 50,
                name: "Unit 3".to_string(),
            }],
            criteria,
            criterion_grades: vec![
                CriterionGrade {
                    userid: 7,
                    coursemoduleid: 50,
                    criteriaid: 100,
                    score: Some(1),
                    remark: "Good work".to_string(),
                },
                CriterionGrade {
                    userid: 7,
                    coursemoduleid: 50,
                    criteriaid: 101,
                    score: Some(0),
                    remark: "Not there yet".to_string(),
                },
                CriterionGrade {
                    userid: 7,
                    coursemoduleid: 50,
                    criteriaid: 102,
                    score: None,
                    remark: "saved without a level".to_string(),
                },
            ],
            submissions: vec![
                Submission {
                    assignid: 50,
                    coursemoduleid: 50,
                    userid: 7,
                    grade: None,
                },
                Submission {
                    assignid: 50,
                    coursemoduleid: 50,
                    userid: 9,
                    grade: Some(2),
                },
            ],
            feedback: vec![Feedback {
                assignid: 50,
                userid: 7,
                commenttext: "Resubmit M1".to_string(),
            }],
            min_criteria,
        }
    }

    #[test]
    fn grade_for_distinguishes_achieved_not_met_and_ungraded() {
        let snap = snapshot();
        assert_eq!(
            snap.grade_for(7, 50, 100),
            CriterionMark::Marked {
                letter: "A",
                remark: "Good work".to_string()
            }
        );
        // Explicit 0 is "not met", not ungraded.
        assert_eq!(
            snap.grade_for(7, 50, 101),
            CriterionMark::Marked {
                letter: "N",
                remark: "Not there yet".to_string()
            }
        );
        // A filling with no score renders blank, remark and all.
        let empty_score = snap.grade_for(7, 50, 102);
        assert_eq!(empty_score, CriterionMark::Ungraded);
        assert_eq!(empty_score.letter(), "");
        assert_eq!(empty_score.remark(), "");
        // No filling at all is also blank, never an error.
        assert_eq!(snap.grade_for(8, 50, 100), CriterionMark::Ungraded);
    }

    #[test]
    fn overall_status_never_conflates_unmarked_and_unsubmitted() {
        let snap = snapshot();
        let unit = snap.assignments[0].clone();
        let alice = snap.overall_status(7, &unit);
        let bob = snap.overall_status(8, &unit);
        assert_eq!(alice, OverallStatus::AwaitingMark);
        assert_eq!(alice.label(), "!");
        assert_eq!(bob, OverallStatus::NotSubmitted);
        assert_eq!(bob.label(), "N");
        assert_ne!(alice.label(), bob.label());

        let graded = snap.overall_status(9, &unit);
        assert_eq!(graded, OverallStatus::Graded(2));
        assert_eq!(graded.label(), "P");
        assert_eq!(graded.style(), "pass");
    }

    #[test]
    fn criteria_keep_definition_order() {
        let snap = snapshot();
        let names: Vec<&str> = snap
            .criteria_for(50)
            .iter()
            .map(|c| c.shortname.as_str())
            .collect();
        assert_eq!(names, vec!["P1", "M1", "D1"]);
        assert!(snap.criteria_for(999).is_empty());
    }

    #[test]
    fn grade_ceiling_reads_the_minimal_criterion() {
        let snap = snapshot();
        assert_eq!(snap.min_criterion_for(50).map(|c| c.shortname.as_str()), Some("D1"));
        assert_eq!(snap.grade_ceiling(50), Some(4));
        assert_eq!(snap.grade_ceiling(999), None);
    }

    #[test]
    fn feedback_lookup_is_per_assignment_and_student() {
        let snap = snapshot();
        assert_eq!(snap.feedback_for(50, 7), Some("Resubmit M1"));
        assert_eq!(snap.feedback_for(50, 8), None);
        assert_eq!(snap.feedback_for(51, 7), None);
    }
}
