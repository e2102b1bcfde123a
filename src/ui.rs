use crate::models::{CurrentUser, HomeContext, MonthGrid, MonthlySummary, Task};
use std::fmt::Write;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            // braces are escaped so user text can never form a template placeholder
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(ch),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{BODY}}", body)
}

pub fn render_home(user: &CurrentUser, ctx: &HomeContext) -> String {
    let selected = ctx.selected_date.to_string();
    let body = HOME_HTML
        .replace("{{SELECTED}}", &selected)
        .replace("{{SELECTED_LONG}}", &ctx.selected_date.format("%A, %B %-d, %Y").to_string())
        .replace("{{TOTAL}}", &ctx.total.to_string())
        .replace("{{COMPLETED}}", &ctx.completed.to_string())
        .replace("{{PROGRESS}}", &ctx.progress.to_string())
        .replace("{{STREAK}}", &ctx.streak.to_string())
        .replace("{{WEEK_CHART}}", &render_bar_chart(&ctx.week_labels, &ctx.week_values))
        .replace("{{PREV_WEEK}}", &ctx.prev_week)
        .replace("{{NEXT_WEEK}}", &ctx.next_week)
        .replace("{{PREV_MONTH}}", &ctx.prev_month)
        .replace("{{NEXT_MONTH}}", &ctx.next_month)
        .replace(
            "{{CALENDAR}}",
            &render_calendar(&ctx.month_name, ctx.year, &ctx.calendar, &selected),
        )
        .replace(
            "{{NEXT_CALENDAR}}",
            &render_calendar(&ctx.next_month_name, ctx.next_year, &ctx.next_calendar, &selected),
        )
        .replace("{{TASKS}}", &render_tasks(&ctx.tasks))
        .replace("{{USERNAME}}", &escape(&user.username));
    page("Daily Tracker", &body)
}

fn render_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return r#"<li class="empty">No tasks for this day.</li>"#.to_string();
    }

    let mut out = String::new();
    for task in tasks {
        let _ = write!(
            out,
            r#"<li class="task{done}">
  <form method="post" action="/toggle/{id}/"><button class="check" title="Toggle">{mark}</button></form>
  <span class="title">{title}</span>
  <form method="post" action="/delete/{id}/"><button class="delete" title="Delete">&times;</button></form>
</li>"#,
            done = if task.is_completed { " done" } else { "" },
            id = task.id,
            mark = if task.is_completed { "&#10003;" } else { "&nbsp;" },
            title = escape(&task.title),
        );
    }
    out
}

fn render_bar_chart(labels: &[String], values: &[u64]) -> String {
    let max = values.iter().copied().max().unwrap_or(0).max(1);
    let mut out = String::new();
    for (label, value) in labels.iter().zip(values) {
        let height = value * 100 / max;
        let _ = write!(
            out,
            r#"<div class="bar"><span class="value">{value}</span><div class="fill" style="height:{height}%"></div><span class="label">{label}</span></div>"#,
            label = escape(label),
        );
    }
    out
}

fn render_calendar(name: &str, year: i32, grid: &MonthGrid, selected: &str) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="month"><h3>{name} {year}</h3><table><thead><tr><th>Mo</th><th>Tu</th><th>We</th><th>Th</th><th>Fr</th><th>Sa</th><th>Su</th></tr></thead><tbody>"#,
        name = escape(name),
    );
    for week in &grid.weeks {
        out.push_str("<tr>");
        for cell in week {
            match cell {
                Some(day) => {
                    let date = day.date.to_string();
                    let current = if date == selected { " selected" } else { "" };
                    let _ = write!(
                        out,
                        r#"<td class="day {status}{current}"><a href="/?date={date}">{num}</a></td>"#,
                        status = day.status.as_str(),
                        num = day.day,
                    );
                }
                None => out.push_str(r#"<td class="blank"></td>"#),
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></div>");
    out
}

pub fn render_monthly(user: &CurrentUser, summary: &MonthlySummary) -> String {
    let rows = if summary.labels.is_empty() {
        r#"<tr><td colspan="2" class="empty">Nothing completed yet this month.</td></tr>"#.to_string()
    } else {
        summary
            .labels
            .iter()
            .zip(&summary.values)
            .map(|(label, value)| format!("<tr><td>{}</td><td>{value}</td></tr>", escape(label)))
            .collect()
    };
    let chart = render_bar_chart(&summary.labels, &summary.values);
    let body = MONTHLY_HTML
        .replace("{{MONTH}}", &escape(&summary.month_name))
        .replace("{{YEAR}}", &summary.year.to_string())
        .replace("{{CHART}}", &chart)
        .replace("{{ROWS}}", &rows)
        .replace("{{USERNAME}}", &escape(&user.username));
    page("Monthly summary", &body)
}

pub fn render_login(next: &str, error: Option<&str>) -> String {
    let body = LOGIN_HTML
        .replace("{{NEXT}}", &escape(next))
        .replace("{{ERROR}}", &render_error(error));
    page("Log in", &body)
}

pub fn render_signup(username: &str, error: Option<&str>) -> String {
    let body = SIGNUP_HTML
        .replace("{{USERNAME}}", &escape(username))
        .replace("{{ERROR}}", &render_error(error));
    page("Sign up", &body)
}

fn render_error(error: Option<&str>) -> String {
    error
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape(message)))
        .unwrap_or_default()
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --partial: #f6c177;
      --complete: #56b38a;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1080px, 100%);
      margin: 0 auto;
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    .narrow {
      width: min(420px, 100%);
    }

    header {
      display: flex;
      justify-content: space-between;
      align-items: baseline;
      gap: 12px;
    }

    h1, h2, h3 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      margin: 0;
    }

    a {
      color: var(--accent-2);
    }

    .columns {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 28px;
    }

    .stats {
      display: flex;
      gap: 18px;
    }

    .stat strong {
      display: block;
      font-size: 1.8rem;
    }

    .progress {
      height: 10px;
      border-radius: 999px;
      background: rgba(47, 72, 88, 0.12);
      overflow: hidden;
    }

    .progress div {
      height: 100%;
      background: var(--accent);
    }

    ul.tasks {
      list-style: none;
      padding: 0;
      margin: 0;
      display: grid;
      gap: 8px;
    }

    .task {
      display: flex;
      align-items: center;
      gap: 10px;
    }

    .task .title {
      flex: 1;
    }

    .task.done .title {
      text-decoration: line-through;
      opacity: 0.6;
    }

    .task form {
      margin: 0;
    }

    button {
      font: inherit;
      border: none;
      border-radius: 12px;
      padding: 8px 14px;
      background: var(--accent-2);
      color: white;
      cursor: pointer;
    }

    button.check {
      width: 30px;
      height: 30px;
      padding: 0;
      background: white;
      color: var(--complete);
      border: 2px solid var(--accent-2);
    }

    button.delete {
      background: transparent;
      color: var(--accent);
      font-size: 1.2rem;
    }

    input {
      font: inherit;
      padding: 8px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.3);
    }

    form.stack {
      display: grid;
      gap: 12px;
    }

    .chart {
      display: flex;
      align-items: flex-end;
      gap: 10px;
      height: 160px;
    }

    .bar {
      flex: 1;
      height: 100%;
      display: flex;
      flex-direction: column;
      justify-content: flex-end;
      align-items: center;
      gap: 4px;
    }

    .bar .fill {
      width: 100%;
      min-height: 2px;
      border-radius: 8px 8px 0 0;
      background: var(--accent);
    }

    table {
      border-collapse: collapse;
      width: 100%;
      text-align: center;
    }

    td.day a {
      display: block;
      padding: 6px 0;
      border-radius: 8px;
      text-decoration: none;
    }

    td.partial a {
      background: var(--partial);
    }

    td.complete a {
      background: var(--complete);
      color: white;
    }

    td.selected a {
      outline: 2px solid var(--accent-2);
    }

    .error {
      color: var(--accent);
    }

    .empty {
      opacity: 0.6;
    }
  </style>
</head>
<body>
{{BODY}}
</body>
</html>
"#;

const HOME_HTML: &str = r#"<main class="app">
  <header>
    <h1>Daily Tracker</h1>
    <nav>{{USERNAME}} &middot; <a href="/monthly/">Monthly</a> &middot; <a href="/logout/">Log out</a></nav>
  </header>
  <div class="columns">
    <section class="stack">
      <h2>{{SELECTED_LONG}}</h2>
      <div class="stats">
        <div class="stat"><strong>{{COMPLETED}}/{{TOTAL}}</strong>done</div>
        <div class="stat"><strong>{{PROGRESS}}%</strong>progress</div>
        <div class="stat"><strong>{{STREAK}}</strong>day streak</div>
      </div>
      <div class="progress"><div style="width:{{PROGRESS}}%"></div></div>
      <ul class="tasks">{{TASKS}}</ul>
      <form class="stack" method="post" action="/">
        <input name="title" maxlength="100" placeholder="New task" required />
        <input name="task_date" type="date" value="{{SELECTED}}" required />
        <button type="submit">Add task</button>
      </form>
    </section>
    <section class="stack">
      <header>
        <a href="/?date={{SELECTED}}&week={{PREV_WEEK}}">&larr; Prev week</a>
        <h3>This week</h3>
        <a href="/?date={{SELECTED}}&week={{NEXT_WEEK}}">Next week &rarr;</a>
      </header>
      <div class="chart">{{WEEK_CHART}}</div>
      <header>
        <a href="/?date={{PREV_MONTH}}">&larr; Prev month</a>
        <a href="/?date={{NEXT_MONTH}}">Next month &rarr;</a>
      </header>
      {{CALENDAR}}
      {{NEXT_CALENDAR}}
    </section>
  </div>
</main>"#;

const MONTHLY_HTML: &str = r#"<main class="app">
  <header>
    <h1>{{MONTH}} {{YEAR}}</h1>
    <nav>{{USERNAME}} &middot; <a href="/">Home</a> &middot; <a href="/logout/">Log out</a></nav>
  </header>
  <div class="chart">{{CHART}}</div>
  <table>
    <thead><tr><th>Day</th><th>Completed</th></tr></thead>
    <tbody>{{ROWS}}</tbody>
  </table>
</main>"#;

const LOGIN_HTML: &str = r#"<main class="app narrow">
  <h1>Log in</h1>
  {{ERROR}}
  <form class="stack" method="post" action="/login/">
    <input type="hidden" name="next" value="{{NEXT}}" />
    <input name="username" placeholder="Username" autofocus required />
    <input name="password" type="password" placeholder="Password" required />
    <button type="submit">Log in</button>
  </form>
  <p>No account? <a href="/signup/">Sign up</a></p>
</main>"#;

const SIGNUP_HTML: &str = r#"<main class="app narrow">
  <h1>Sign up</h1>
  {{ERROR}}
  <form class="stack" method="post" action="/signup/">
    <input name="username" value="{{USERNAME}}" maxlength="150" placeholder="Username" autofocus required />
    <input name="password1" type="password" placeholder="Password" required />
    <input name="password2" type="password" placeholder="Password confirmation" required />
    <button type="submit">Create account</button>
  </form>
  <p>Already registered? <a href="/login/">Log in</a></p>
</main>"#;
