use rusqlite::Connection;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct Course {
    pub id: i64,
    pub fullname: String,
}

#[derive(Debug, Clone)]
pub struct Student {
    pub userid: i64,
    pub idnumber: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub groupid: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub assignid: i64,
    pub coursemoduleid: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Criterion {
    pub criteriaid: i64,
    pub assignid: i64,
    pub coursemoduleid: i64,
    pub shortname: String,
}

/// One finalized rubric filling. `score` is None when the marker saved the
/// filling without a level; that renders blank, same as no filling at all.
#[derive(Debug, Clone)]
pub struct CriterionGrade {
    pub userid: i64,
    pub coursemoduleid: i64,
    pub criteriaid: i64,
    pub score: Option<i64>,
    pub remark: String,
}

/// A submitted submission with its (possibly absent) assignment grade.
/// `grade` of None means submitted but not yet marked.
#[derive(Debug, Clone)]
pub struct Submission {
    pub assignid: i64,
    pub coursemoduleid: i64,
    pub userid: i64,
    pub grade: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Feedback {
    pub assignid: i64,
    pub userid: i64,
    pub commenttext: String,
}

pub fn fetch_course(conn: &Connection, courseid: i64) -> anyhow::Result<Option<Course>> {
    use rusqlite::OptionalExtension;
    let row = conn
        .query_row(
            "SELECT id, fullname FROM course WHERE id = ?",
            [courseid],
            |r| {
                Ok(Course {
                    id: r.get(0)?,
                    fullname: r.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Groups defined in the course. Ordered by name so the dropdown is stable.
pub fn fetch_groups(conn: &Connection, courseid: i64) -> anyhow::Result<Vec<Group>> {
    let mut stmt =
        conn.prepare("SELECT id, name FROM groups WHERE courseid = ? ORDER BY name, id")?;
    let rows = stmt
        .query_map([courseid], |r| {
            Ok(Group {
                groupid: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Students actively enrolled in the course, optionally restricted to one
/// group's membership. The (lastname, firstname, userid) order is part of
/// the report contract, not a cosmetic choice.
pub fn fetch_students(
    conn: &Connection,
    courseid: i64,
    groupid: Option<i64>,
) -> anyhow::Result<Vec<Student>> {
    let mut sql = String::from(
        "SELECT DISTINCT stu.id, COALESCE(stu.idnumber, ''), stu.firstname, stu.lastname,
                COALESCE(stu.username, '')
         FROM user stu
         JOIN user_enrolments ue ON ue.userid = stu.id
         JOIN enrol enr ON enr.id = ue.enrolid",
    );
    if groupid.is_some() {
        sql.push_str(" JOIN groups_members gm ON gm.userid = stu.id");
    }
    sql.push_str(" WHERE enr.courseid = ?");
    if groupid.is_some() {
        sql.push_str(" AND gm.groupid = ?");
    }
    sql.push_str(" ORDER BY stu.lastname ASC, stu.firstname ASC, stu.id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |r: &rusqlite::Row<'_>| {
        Ok(Student {
            userid: r.get(0)?,
            idnumber: r.get(1)?,
            firstname: r.get(2)?,
            lastname: r.get(3)?,
            username: r.get(4)?,
        })
    };
    let rows = match groupid {
        Some(gid) => stmt
            .query_map((courseid, gid), map_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([courseid], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

/// Assignments in the course whose grading area actively uses the BTEC
/// rubric method against the "BTEC" scale. Ordered by assignment id, which
/// is creation order in the host store.
pub fn fetch_rubric_assignments(
    conn: &Connection,
    courseid: i64,
) -> anyhow::Result<Vec<Assignment>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT a.id, cm.id, a.name
         FROM scale s
         JOIN grade_items gi ON gi.scaleid = s.id
         JOIN course_modules cm ON cm.instance = gi.iteminstance
         JOIN modules m ON m.id = cm.module
         JOIN assign a ON a.id = cm.instance
         JOIN context ctx ON ctx.instanceid = cm.id
         JOIN grading_areas ga ON ga.contextid = ctx.id
         WHERE s.name = 'BTEC'
           AND m.name = 'assign'
           AND gi.itemmodule = 'assign'
           AND ga.activemethod = 'btec'
           AND cm.course = ?
         ORDER BY a.id",
    )?;
    let rows = stmt
        .query_map([courseid], |r| {
            Ok(Assignment {
                assignid: r.get(0)?,
                coursemoduleid: r.get(1)?,
                name: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All rubric criteria across the course, ordered by assignment name and
/// then definition order. Criteria for one assignment keep their authored
/// order when sliced out of this list.
pub fn fetch_rubric_criteria(conn: &Connection, courseid: i64) -> anyhow::Result<Vec<Criterion>> {
    let mut stmt = conn.prepare(
        "SELECT gbc.id, a.id, cm.id, gbc.shortname
         FROM assign a
         JOIN course_modules cm ON cm.instance = a.id
         JOIN modules m ON m.id = cm.module
         JOIN context ctx ON ctx.instanceid = cm.id
         JOIN grading_areas ga ON ga.contextid = ctx.id
         JOIN grading_definitions gd ON gd.areaid = ga.id
         JOIN gradingform_btec_criteria gbc ON gbc.definitionid = gd.id
         WHERE m.name = 'assign'
           AND gd.method = 'btec'
           AND cm.course = ?
         ORDER BY a.name ASC, gbc.sortorder ASC, gbc.id ASC",
    )?;
    let rows = stmt
        .query_map([courseid], |r| {
            Ok(Criterion {
                criteriaid: r.get(0)?,
                assignid: r.get(1)?,
                coursemoduleid: r.get(2)?,
                shortname: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Finalized rubric fillings for the course: one row per graded
/// (student, course module, criterion) triple. Instance status 1 is the
/// host's "finalized/published" marker; drafts never reach the report.
pub fn fetch_criterion_grades(
    conn: &Connection,
    courseid: i64,
) -> anyhow::Result<Vec<CriterionGrade>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, cm.id, gbc.id, gbf.score, COALESCE(gbf.remark, '')
         FROM course_modules cm
         JOIN modules m ON m.id = cm.module
         JOIN context ctx ON ctx.instanceid = cm.id
         JOIN grading_areas ga ON ga.contextid = ctx.id
         JOIN grading_definitions gd ON gd.areaid = ga.id
         JOIN gradingform_btec_criteria gbc ON gbc.definitionid = gd.id
         JOIN grading_instances gin ON gin.definitionid = gd.id
         JOIN assign_grades ag ON ag.id = gin.itemid
         JOIN user u ON u.id = ag.userid
         JOIN gradingform_btec_fillings gbf
           ON gbf.instanceid = gin.id AND gbf.criterionid = gbc.id
         WHERE gin.status = 1
           AND m.name = 'assign'
           AND gd.method = 'btec'
           AND cm.course = ?",
    )?;
    let rows = stmt
        .query_map([courseid], |r| {
            Ok(CriterionGrade {
                userid: r.get(0)?,
                coursemoduleid: r.get(1)?,
                criteriaid: r.get(2)?,
                score: r.get(3)?,
                remark: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Submitted submissions for the course's BTEC assignments, with the
/// assignment-level grade left-joined in (null until marked).
pub fn fetch_submissions(conn: &Connection, courseid: i64) -> anyhow::Result<Vec<Submission>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, cm.id, asub.userid, ag.grade
         FROM assign_submission asub
         JOIN assign a ON a.id = asub.assignment
         JOIN course_modules cm ON cm.instance = a.id
         JOIN modules m ON m.id = cm.module
         JOIN grade_items gi ON gi.iteminstance = cm.instance AND gi.itemmodule = 'assign'
         JOIN scale s ON s.id = gi.scaleid
         LEFT JOIN assign_grades ag
           ON ag.assignment = asub.assignment AND ag.userid = asub.userid
         WHERE asub.status = 'submitted'
           AND s.name = 'BTEC'
           AND m.name = 'assign'
           AND cm.course = ?
         ORDER BY asub.id",
    )?;
    let rows = stmt
        .query_map([courseid], |r| {
            Ok(Submission {
                assignid: r.get(0)?,
                coursemoduleid: r.get(1)?,
                userid: r.get(2)?,
                grade: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overall feedback comments for the whole course, keyed (assignid, userid).
/// Fetched once per render; per-cell lookups happen in memory.
pub fn fetch_feedback(conn: &Connection, courseid: i64) -> anyhow::Result<Vec<Feedback>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, ag.userid, afc.commenttext
         FROM assign a
         JOIN assign_grades ag ON ag.assignment = a.id
         JOIN assignfeedback_comments afc ON afc.grade = ag.id
         WHERE a.course = ?
         ORDER BY afc.id",
    )?;
    let rows = stmt
        .query_map([courseid], |r| {
            Ok(Feedback {
                assignid: r.get(0)?,
                userid: r.get(1)?,
                commenttext: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Comparison policy for ranking a rubric's criteria by shortname. The
/// default is plain lexicographic order, which holds for the conventional
/// P1/M1/D1 naming but not for names like P10 vs P2; it lives behind this
/// alias so callers never bake the comparison in.
pub type CriterionPolicy = fn(&Criterion, &Criterion) -> Ordering;

pub fn shortname_lexicographic(a: &Criterion, b: &Criterion) -> Ordering {
    a.shortname
        .cmp(&b.shortname)
        .then(a.criteriaid.cmp(&b.criteriaid))
}

/// For each rubric-graded assignment, the policy-minimal criterion. The
/// criteriaid tie-break in the policy keeps the pick deterministic when
/// shortnames collide.
pub fn fetch_min_criterion_per_assignment(
    conn: &Connection,
    courseid: i64,
    policy: CriterionPolicy,
) -> anyhow::Result<Vec<Criterion>> {
    let criteria = fetch_rubric_criteria(conn, courseid)?;
    Ok(min_criteria(&criteria, policy))
}

pub fn min_criteria(criteria: &[Criterion], policy: CriterionPolicy) -> Vec<Criterion> {
    let mut mins: Vec<Criterion> = Vec::new();
    for c in criteria {
        match mins
            .iter_mut()
            .find(|m| m.coursemoduleid == c.coursemoduleid)
        {
            Some(current) => {
                if policy(c, current) == Ordering::Less {
                    *current = c.clone();
                }
            }
            None => mins.push(c.clone()),
        }
    }
    mins
}
