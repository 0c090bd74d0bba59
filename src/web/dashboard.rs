//! Status snapshot and the HTML page built from it.

use serde::Serialize;
use std::fmt::Write;

use super::AppState;
use crate::actuator::Command;
use crate::geo::Provenance;
use crate::sensors::read_or_zero;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub label: String,
    pub next_run: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub time: String,
    pub temperature_f: f64,
    pub humidity: f64,
    pub sunrise: String,
    pub sunrise_provenance: Provenance,
    pub dusk: String,
    pub dusk_provenance: Provenance,
    pub fallback_sunrise: String,
    pub fallback_dusk: String,
    pub jobs: Vec<JobView>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl StatusSnapshot {
    /// Gather everything the dashboard shows. Blocks on the sensor.
    pub fn collect(state: &AppState) -> Self {
        let now = state.clock.now().with_timezone(&state.tz);
        let today = now.date_naive();
        let times = match state.scheduler.last_solar_times() {
            Some(times) if times.date == today => times,
            _ => state.scheduler.resolver().resolve_day(today),
        };
        let fallback = state.scheduler.resolver().fallback_times();
        let climate = read_or_zero(state.sensor.as_deref());

        Self {
            time: now.format("%A, %B %d  %-H:%M").to_string(),
            temperature_f: round1(climate.fahrenheit()),
            humidity: round1(climate.humidity),
            sunrise: times.sunrise.at.format("%m-%d-%y %H:%M").to_string(),
            sunrise_provenance: times.sunrise.provenance,
            dusk: times.dusk.at.format("%m-%d-%y %H:%M").to_string(),
            dusk_provenance: times.dusk.provenance,
            fallback_sunrise: fallback.sunrise.format("%H:%M").to_string(),
            fallback_dusk: fallback.dusk.format("%H:%M").to_string(),
            jobs: state
                .scheduler
                .pending_jobs()
                .into_iter()
                .map(|job| JobView {
                    next_run: job.fire_at.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
                    label: job.label,
                })
                .collect(),
        }
    }
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Coop</title>
<style>
body { font-family: sans-serif; margin: 1.5em; max-width: 40em; }
table { border-collapse: collapse; }
td { padding: 0.2em 0.8em 0.2em 0; }
button { margin: 0.2em; padding: 0.6em 1em; }
.fallback { color: #a60; }
</style>
</head>
<body>
"#;

const PAGE_SCRIPT: &str = r#"<script>
function trigger(route) {
  const out = document.getElementById("result");
  out.textContent = "...";
  fetch("/" + route)
    .then(r => r.json())
    .then(j => { out.textContent = j.result || j.error; })
    .catch(e => { out.textContent = e; });
}
</script>
"#;

fn provenance_note(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::Live => "",
        Provenance::Fallback => r#" <span class="fallback">(fallback)</span>"#,
    }
}

pub(super) fn render_dashboard(snapshot: &StatusSnapshot) -> String {
    let mut html = String::from(PAGE_HEAD);

    // Writing to a String cannot fail
    let _ = writeln!(html, "<h1>{}</h1>", snapshot.time);
    let _ = writeln!(
        html,
        "<p>Temperature {:.1}&deg;F &middot; Humidity {:.1}%</p>",
        snapshot.temperature_f, snapshot.humidity
    );

    html.push_str("<table>\n");
    let _ = writeln!(
        html,
        "<tr><td>Sunrise</td><td>{}{}</td></tr>",
        snapshot.sunrise,
        provenance_note(snapshot.sunrise_provenance)
    );
    let _ = writeln!(
        html,
        "<tr><td>Dusk</td><td>{}{}</td></tr>",
        snapshot.dusk,
        provenance_note(snapshot.dusk_provenance)
    );
    let _ = writeln!(
        html,
        "<tr><td>Fallback</td><td>sunrise {} &middot; dusk {}</td></tr>",
        snapshot.fallback_sunrise, snapshot.fallback_dusk
    );
    html.push_str("</table>\n");

    html.push_str("<h2>Scheduled</h2>\n<ul>\n");
    if snapshot.jobs.is_empty() {
        html.push_str("<li>Nothing pending</li>\n");
    }
    for job in &snapshot.jobs {
        let _ = writeln!(html, "<li>{} (next run at: {})</li>", job.label, job.next_run);
    }
    html.push_str("</ul>\n");

    html.push_str("<h2>Manual</h2>\n<p>\n");
    for command in Command::ALL {
        let _ = writeln!(
            html,
            r#"<button onclick="trigger('{}')">{}</button>"#,
            command.route(),
            command.label()
        );
    }
    html.push_str("</p>\n<p id=\"result\"></p>\n");

    html.push_str(PAGE_SCRIPT);
    html.push_str("</body>\n</html>\n");
    html
}
