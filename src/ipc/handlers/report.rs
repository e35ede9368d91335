use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::render;
use crate::report::{CriterionMark, ReportError, ReportSnapshot};
use rusqlite::Connection;
use serde_json::json;

fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_source", "open a gradebook first"))
}

/// courseId is the root key of every report query; it is validated before
/// anything touches the store.
fn required_course_id(req: &Request) -> Result<i64, serde_json::Value> {
    req.params
        .get("courseId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", "missing or non-integer courseId"))
}

fn optional_group_id(req: &Request) -> Result<Option<i64>, serde_json::Value> {
    match req.params.get("groupId") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => match v.as_i64() {
            Some(gid) => Ok(Some(gid)),
            None => Err(err(&req.id, "bad_params", "groupId must be an integer")),
        },
    }
}

fn report_err(req: &Request, e: ReportError) -> serde_json::Value {
    err(&req.id, &e.code, e.message)
}

fn handle_groups_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let courseid = match required_course_id(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match crate::store::fetch_groups(conn, courseid) {
        Ok(groups) => ok(
            &req.id,
            json!({
                "courseId": courseid,
                "groups": groups
                    .iter()
                    .map(|g| json!({ "groupId": g.groupid, "name": g.name }))
                    .collect::<Vec<_>>()
            }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string()),
    }
}

fn load_snapshot(
    state: &AppState,
    req: &Request,
) -> Result<ReportSnapshot, serde_json::Value> {
    let conn = db_conn(state, req)?;
    let courseid = required_course_id(req)?;
    let groupid = optional_group_id(req)?;
    ReportSnapshot::load(conn, courseid, groupid).map_err(|e| report_err(req, e))
}

fn criterion_mark_json(mark: &CriterionMark) -> serde_json::Value {
    let style = match mark.letter() {
        "A" => "achieved",
        "N" => "notmet",
        _ => "",
    };
    json!({
        "grade": mark.letter(),
        "style": style,
        "remark": mark.remark(),
    })
}

fn snapshot_model(snap: &ReportSnapshot) -> serde_json::Value {
    let assignments: Vec<serde_json::Value> = snap
        .assignments
        .iter()
        .map(|a| {
            json!({
                "assignId": a.assignid,
                "courseModuleId": a.coursemoduleid,
                "name": a.name,
                "displayName": render::display_assignment_name(&a.name),
                "minCriterion": snap
                    .min_criterion_for(a.coursemoduleid)
                    .map(|c| c.shortname.clone()),
                "gradeCeiling": snap.grade_ceiling(a.coursemoduleid),
            })
        })
        .collect();

    // Same student -> assignment -> criterion walk the renderer performs.
    let students: Vec<serde_json::Value> = snap
        .students
        .iter()
        .map(|user| {
            let rows: Vec<serde_json::Value> = snap
                .assignments
                .iter()
                .map(|a| {
                    let status = snap.overall_status(user.userid, a);
                    let criteria: Vec<serde_json::Value> = snap
                        .criteria_for(a.coursemoduleid)
                        .iter()
                        .map(|c| {
                            let mark =
                                snap.grade_for(user.userid, a.coursemoduleid, c.criteriaid);
                            let mut cell = criterion_mark_json(&mark);
                            cell["criteriaId"] = json!(c.criteriaid);
                            cell["shortname"] = json!(c.shortname);
                            cell
                        })
                        .collect();
                    json!({
                        "assignId": a.assignid,
                        "courseModuleId": a.coursemoduleid,
                        "status": status.label(),
                        "statusStyle": status.style(),
                        "criteria": criteria,
                        "feedback": snap.feedback_for(a.assignid, user.userid),
                    })
                })
                .collect();
            json!({
                "userId": user.userid,
                "idNumber": user.idnumber,
                "firstName": user.firstname,
                "lastName": user.lastname,
                "username": user.username,
                "assignments": rows,
            })
        })
        .collect();

    json!({
        "course": { "id": snap.course.id, "fullname": snap.course.fullname },
        "groups": snap
            .groups
            .iter()
            .map(|g| json!({ "groupId": g.groupid, "name": g.name }))
            .collect::<Vec<_>>(),
        "selectedGroup": snap.selected_group,
        "generatedAt": chrono::Utc::now().to_rfc3339(),
        "assignments": assignments,
        "students": students,
    })
}

fn handle_report_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    match load_snapshot(state, req) {
        Ok(snap) => ok(&req.id, snapshot_model(&snap)),
        Err(e) => e,
    }
}

fn handle_report_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    match load_snapshot(state, req) {
        Ok(snap) => ok(
            &req.id,
            json!({
                "courseId": snap.course.id,
                "html": render::render_report(&snap),
            }),
        ),
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "groups.list" => Some(handle_groups_list(state, req)),
        "report.model" => Some(handle_report_model(state, req)),
        "report.render" => Some(handle_report_render(state, req)),
        _ => None,
    }
}
