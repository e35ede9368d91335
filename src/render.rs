use crate::report::ReportSnapshot;

const NAME_DISPLAY_LIMIT: usize = 15;

/// Assignment names are clipped to 15 characters in the grid; the full name
/// always travels in the title attribute. Names at or under the limit are
/// left alone.
pub fn display_assignment_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= NAME_DISPLAY_LIMIT {
        name.to_string()
    } else {
        let mut short: String = chars[..NAME_DISPLAY_LIMIT].iter().collect();
        short.push_str("...");
        short
    }
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_group_select(snap: &ReportSnapshot) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"report-controls\"><label for=\"group-select\">Group</label> ");
    out.push_str("<select id=\"group-select\" name=\"group\">");
    if snap.selected_group.is_none() {
        out.push_str("<option value=\"\" selected>All</option>");
    } else {
        out.push_str("<option value=\"\">All</option>");
    }
    for g in &snap.groups {
        let selected = if snap.selected_group == Some(g.groupid) {
            " selected"
        } else {
            ""
        };
        out.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            g.groupid,
            selected,
            html_escape(&g.name)
        ));
    }
    out.push_str("</select></div>");
    out
}

fn render_legend() -> String {
    "<p class=\"report-key\">Key: N = no submission / not met, \
     ! = submitted awaiting marking, A = achieved, R = refer, P = pass, \
     M = merit, D = distinction</p>"
        .to_string()
}

/// The grid itself: one student-header row per student, then per assignment
/// a name/status row, one row per criterion, and an overall-feedback row.
/// This walk order is the report's public contract.
pub fn render_table(snap: &ReportSnapshot) -> String {
    let mut out = String::new();
    out.push_str("<table id=\"grades\" border=\"1\">\n<tbody>\n");

    for user in &snap.students {
        out.push_str(&format!(
            "<tr><td colspan=\"4\">First Name</td><td>{}</td>\
             <td colspan=\"5\">Last Name</td><td>{}</td></tr>\n",
            html_escape(&user.firstname),
            html_escape(&user.lastname)
        ));

        for assign in &snap.assignments {
            let status = snap.overall_status(user.userid, assign);
            let status_class = if status.style().is_empty() {
                String::new()
            } else {
                format!(" class=\"{}\"", status.style())
            };
            out.push_str(&format!(
                "<tr><td colspan=\"12\" title=\"{}\">{}</td><td{}>{}</td></tr>\n",
                html_escape(&assign.name),
                html_escape(&display_assignment_name(&assign.name)),
                status_class,
                status.label()
            ));

            for criterion in snap.criteria_for(assign.coursemoduleid) {
                let mark = snap.grade_for(user.userid, assign.coursemoduleid, criterion.criteriaid);
                let cell = match mark.letter() {
                    "A" => "<td colspan=\"5\" class=\"achieved\">",
                    "N" => "<td colspan=\"5\" class=\"notmet\">",
                    _ => "<td colspan=\"5\">",
                };
                out.push_str(&format!(
                    "<tr><th colspan=\"4\" class=\"criteria\">{}</th>{}{}</td><td colspan=\"6\">{}</td></tr>\n",
                    html_escape(&criterion.shortname),
                    cell,
                    mark.letter(),
                    html_escape(mark.remark())
                ));
            }

            let feedback = match snap.feedback_for(assign.assignid, user.userid) {
                Some(text) => html_escape(text),
                None => "&nbsp;".to_string(),
            };
            out.push_str(&format!(
                "<tr><td colspan=\"7\" class=\"feedback\">{}</td></tr>\n",
                feedback
            ));
        }
    }

    out.push_str("</tbody>\n</table>");
    out
}

/// Full report fragment: course heading, group selector, legend, grid.
pub fn render_report(snap: &ReportSnapshot) -> String {
    format!(
        "<h2>{}</h2>\n{}\n{}\n{}",
        html_escape(&snap.course.fullname),
        render_group_select(snap),
        render_legend(),
        render_table(snap)
    )
}
