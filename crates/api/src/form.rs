// HTML rendering for the prediction form

use std::fmt::Write;

use hoop_models::{team_name, PlayerInfo, PredictionRequest, StatPrediction};

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem;color:#1d1d1f}\
h1{font-size:1.6rem}form{display:grid;gap:.8rem;margin-bottom:1.5rem}\
select,button{padding:.4rem;font-size:1rem}\
.metrics{display:grid;grid-template-columns:repeat(4,1fr);gap:.8rem}\
.metric{border:1px solid #ddd;border-radius:6px;padding:.6rem;text-align:center}\
.metric b{display:block;font-size:1.6rem}\
.bar{background:#eee;border-radius:4px;height:1.2rem;overflow:hidden}\
.bar div{background:#c9082a;height:100%}\
.error{background:#fdecea;border:1px solid #f5c2c0;padding:.8rem;border-radius:6px}\
table{border-collapse:collapse;width:100%}td{border-bottom:1px solid #eee;padding:.2rem .4rem}";

pub enum Outcome<'a> {
    Empty,
    Prediction(&'a StatPrediction),
    Error(&'a str),
}

/// Options and current selection for the form.
pub struct FormView<'a> {
    pub players: &'a [PlayerInfo],
    pub teams: &'a [String],
    pub selected: Option<&'a PredictionRequest>,
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_page(view: &FormView<'_>, outcome: &Outcome<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>NBA Player Stat Predictor</title><style>{STYLE}</style></head><body>\
         <h1>🏀 NBA Player Stat Predictor</h1>\
         <p>Pick a player, an opponent and a venue. The player's most recent game supplies every other input.</p>"
    );
    render_form(&mut html, view);
    match outcome {
        Outcome::Empty => {}
        Outcome::Prediction(prediction) => render_prediction(&mut html, prediction),
        Outcome::Error(message) => {
            let _ = write!(html, "<div class=\"error\">{}</div>", escape(message));
        }
    }
    html.push_str("</body></html>");
    html
}

fn render_form(html: &mut String, view: &FormView<'_>) {
    let selected_player = view.selected.map(|r| r.player_id);
    let selected_team = view.selected.map(|r| r.opponent.as_str());
    let home = view.selected.map_or(true, |r| r.home);

    html.push_str("<form method=\"post\" action=\"/predict\">");
    html.push_str("<label>Player <select name=\"player_id\" required>");
    for player in view.players {
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            player.player_id,
            selected_attr(selected_player == Some(player.player_id)),
            escape(&player.display_label())
        );
    }
    html.push_str("</select></label>");

    html.push_str("<label>Opponent <select name=\"opponent\" required>");
    for team in view.teams {
        let label = match team_name(team) {
            Some(full) => format!("{team} ({full})"),
            None => team.clone(),
        };
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            escape(team),
            selected_attr(selected_team == Some(team.as_str())),
            escape(&label)
        );
    }
    html.push_str("</select></label>");

    let _ = write!(
        html,
        "<fieldset><legend>Location</legend>\
         <label><input type=\"radio\" name=\"location\" value=\"home\"{}> Home</label> \
         <label><input type=\"radio\" name=\"location\" value=\"away\"{}> Away</label></fieldset>",
        checked_attr(home),
        checked_attr(!home)
    );
    html.push_str("<button type=\"submit\">Predict</button></form>");
}

fn render_prediction(html: &mut String, prediction: &StatPrediction) {
    let venue = if prediction.home { "vs." } else { "@" };
    let _ = write!(
        html,
        "<h2>{} {} {}</h2>",
        escape(&prediction.player_name),
        venue,
        escape(&prediction.opponent)
    );
    html.push_str("<div class=\"metrics\">");
    for (label, value) in [
        ("Points", prediction.points),
        ("Assists", prediction.assists),
        ("Rebounds", prediction.rebounds),
        ("3PT Made", prediction.threes_made),
    ] {
        let _ = write!(html, "<div class=\"metric\">{label}<b>{value:.1}</b></div>");
    }
    html.push_str("</div>");

    let percent = prediction.double_double_percent();
    let _ = write!(
        html,
        "<h3>Double-double probability: {percent:.1}%</h3>\
         <div class=\"bar\"><div style=\"width:{percent:.0}%\"></div></div>"
    );

    if let Some(date) = prediction.based_on_game {
        let _ = write!(html, "<p>Inputs taken from the game on {date}.</p>");
    }
    if !prediction.features_used.is_empty() {
        html.push_str("<details><summary>Feature values used</summary><table>");
        for (name, value) in &prediction.features_used {
            let _ = write!(html, "<tr><td>{}</td><td>{value:.3}</td></tr>", escape(name));
        }
        html.push_str("</table></details>");
    }
}

fn selected_attr(on: bool) -> &'static str {
    if on {
        " selected"
    } else {
        ""
    }
}

fn checked_attr(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}
