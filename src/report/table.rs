/// HTML table rendering for mailed summaries
use super::{DayStats, OverallStats, SeriesStats};

fn stat_cells(stats: Option<&SeriesStats>) -> String {
    match stats {
        Some(s) => format!(
            "<td>{:.1}</td><td>{:.1}</td><td>{:.1}</td><td>{:.1}</td>",
            s.min, s.mean, s.median, s.max
        ),
        None => "<td></td><td></td><td></td><td></td>".to_string(),
    }
}

/// Per-day aggregate table: gravity and °C, min/mean/median/max each.
pub fn daily_table(days: &[DayStats]) -> String {
    let mut html = String::from(
        "<table border=\"1\">\n\
         <tr><th rowspan=\"2\">Date</th>\
         <th colspan=\"4\">Specific gravity</th>\
         <th colspan=\"4\">Temperature (°C)</th></tr>\n\
         <tr><th>min</th><th>mean</th><th>median</th><th>max</th>\
         <th>min</th><th>mean</th><th>median</th><th>max</th></tr>\n",
    );
    for day in days {
        html.push_str(&format!(
            "<tr><td>{}</td>{}{}</tr>\n",
            day.date,
            stat_cells(day.gravity.as_ref()),
            stat_cells(day.celsius.as_ref())
        ));
    }
    html.push_str("</table>\n");
    html
}

/// Overall extremes table.
pub fn min_max_table(overall: &OverallStats) -> String {
    format!(
        "<table border=\"1\">\n\
         <tr><th></th><th>min</th><th>max</th></tr>\n\
         <tr><td>Specific gravity</td><td>{:.1}</td><td>{:.1}</td></tr>\n\
         <tr><td>Temperature (°C)</td><td>{:.1}</td><td>{:.1}</td></tr>\n\
         </table>\n",
        overall.gravity_min, overall.gravity_max, overall.celsius_min, overall.celsius_max
    )
}
