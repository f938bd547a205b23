use crate::interaction::{Searchable, Tab, Theme, ViewSwitcher, filter_visibility};
use crate::views::{
    AttendanceRow, BarChart, Counter, Dashboard, NO_DATA, Overview, Presence, SessionCard,
    StudentCard, TeacherRow,
};
use std::fmt::Write;

pub struct Page<'a> {
    pub dashboard: &'a Dashboard,
    pub theme: Theme,
    pub views: ViewSwitcher,
    pub query: &'a str,
    pub notice: Option<&'a str>,
}

pub fn render_page(page: &Page<'_>) -> String {
    let active = page.views.active();
    let query_for = |tab: Tab| if active == tab { page.query } else { "" };
    let section_class = |tab: Tab| {
        if page.views.is_active(tab) {
            "content-section active"
        } else {
            "content-section"
        }
    };

    let dashboard = page.dashboard;
    let notice = page
        .notice
        .map(|message| {
            format!(
                r#"<div id="notice" class="notice" role="alert">{}</div>"#,
                escape(message)
            )
        })
        .unwrap_or_default();

    let tabs = render_tabs(&page.views);
    let counters = render_counters(&dashboard.counters);
    let bar_chart = render_bar_chart(&dashboard.bar_chart);
    let overview = render_overview(&dashboard.overview);
    let students = render_students(&dashboard.students, query_for(Tab::Students));
    let teachers = render_teachers(&dashboard.teachers, query_for(Tab::Teachers));
    let sessions = render_sessions(&dashboard.sessions, query_for(Tab::Sessions));
    let attendance = render_attendance(&dashboard.attendance, query_for(Tab::Attendance));
    let queries = Tab::ALL.map(|tab| escape(query_for(tab)));

    fill(
        INDEX_HTML,
        &[
            ("THEME", page.theme.as_str()),
            ("THEME_ICON", page.theme.icon()),
            ("THEME_LABEL", page.theme.label()),
            ("NOTICE", notice.as_str()),
            ("TABS", tabs.as_str()),
            ("OVERVIEW_CLASS", section_class(Tab::Overview)),
            ("STUDENTS_CLASS", section_class(Tab::Students)),
            ("TEACHERS_CLASS", section_class(Tab::Teachers)),
            ("SESSIONS_CLASS", section_class(Tab::Sessions)),
            ("ATTENDANCE_CLASS", section_class(Tab::Attendance)),
            ("COUNTERS", counters.as_str()),
            ("BAR_CHART", bar_chart.as_str()),
            ("OVERVIEW", overview.as_str()),
            ("STUDENTS_QUERY", queries[1].as_str()),
            ("STUDENTS", students.as_str()),
            ("TEACHERS_QUERY", queries[2].as_str()),
            ("TEACHERS", teachers.as_str()),
            ("SESSIONS_QUERY", queries[3].as_str()),
            ("SESSIONS", sessions.as_str()),
            ("ATTENDANCE_QUERY", queries[4].as_str()),
            ("ATTENDANCE", attendance.as_str()),
        ],
    )
}

fn render_tabs(views: &ViewSwitcher) -> String {
    views
        .states()
        .into_iter()
        .fold(String::new(), |mut out, (tab, active)| {
            let class = if active { "tab active" } else { "tab" };
            let _ = write!(
                out,
                r#"<button class="{class}" type="button" data-tab="{}">{}</button>"#,
                tab.as_str(),
                tab.title()
            );
            out
        })
}

fn render_counters(counters: &[Counter]) -> String {
    counters.iter().fold(String::new(), |mut out, counter| {
        let _ = write!(
            out,
            r#"<div class="stat-card"><div class="stat-label">{}</div><div class="stat-value" id="{}" data-target="{}">0</div></div>"#,
            counter.label, counter.id, counter.target
        );
        out
    })
}

fn render_bar_chart(chart: &BarChart) -> String {
    if chart.bars.is_empty() {
        return no_data_block();
    }
    chart.bars.iter().fold(String::new(), |mut out, bar| {
        let _ = write!(
            out,
            r#"<div class="bar-item"><div class="bar-value">{}</div><div class="bar-wrapper"><div class="bar" style="height: {}px; background: {}"></div></div><div class="bar-label" title="{}">{}</div></div>"#,
            bar.value_text,
            bar.height_px,
            bar.tier.gradient(),
            escape(&bar.name),
            escape(&bar.label)
        );
        out
    })
}

fn render_overview(overview: &Overview) -> String {
    format!(
        r#"<div class="pie-visual" style="--present-angle: {angle}deg"></div>
<div class="pie-legend">
  <div class="legend-item"><div class="legend-color" style="background: var(--success)"></div><div><div class="legend-text">حاضر: {present}</div><div class="detail-label">{present_pct}%</div></div></div>
  <div class="legend-item"><div class="legend-color" style="background: var(--danger)"></div><div><div class="legend-text">غائب: {absent}</div><div class="detail-label">{absent_pct}%</div></div></div>
  <div class="legend-item"><div class="legend-color" style="background: linear-gradient(135deg, var(--success), var(--danger))"></div><div><div class="legend-text">الإجمالي: {total}</div><div class="detail-label">100%</div></div></div>
</div>"#,
        angle = overview.present_angle,
        present = overview.present,
        present_pct = overview.present_percentage,
        absent = overview.absent,
        absent_pct = overview.absent_percentage,
        total = overview.total,
    )
}

fn render_students(cards: &[StudentCard], query: &str) -> String {
    if cards.is_empty() {
        return no_data_block();
    }
    each_visible(cards, query, student_card)
}

fn student_card(out: &mut String, card: &StudentCard, hidden: &str) {
    let _ = write!(
        out,
        r#"<div class="student-card filterable"{hidden}>
  <div class="student-header"><div class="student-name">{name}</div><span class="badge {badge}">{tier}</span></div>
  <div class="student-details">
    <div class="detail-item"><div class="detail-label">رقم WhatsApp</div><div class="detail-value">📱 {whatsapp}</div></div>
    <div class="detail-item"><div class="detail-label">نسبة الحضور</div><div class="detail-value">{rate}</div></div>
    <div class="detail-item"><div class="detail-label">الحضور</div><div class="detail-value" style="color: var(--success)">✅ {present}</div></div>
    <div class="detail-item"><div class="detail-label">الغياب</div><div class="detail-value" style="color: var(--danger)">❌ {absent}</div></div>
    <div class="detail-item"><div class="detail-label">إجمالي المحاضرات</div><div class="detail-value">📚 {total}</div></div>
    <div class="detail-item"><div class="detail-label">RFID</div><div class="detail-value">{rfid}</div></div>
  </div>
  <div class="progress-bar"><div class="progress-fill" style="width: {width}%; background: {gradient}"></div></div>
</div>"#,
        name = escape(&card.name),
        badge = card.tier.badge_class(),
        tier = card.tier_label,
        whatsapp = escape(&card.whatsapp),
        rate = escape(&card.rate_text),
        present = card.present,
        absent = card.absent,
        total = card.total_sessions,
        rfid = escape(&card.uid_rfid),
        width = card.progress_width,
        gradient = card.tier.gradient(),
    );
}

fn render_teachers(rows: &[TeacherRow], query: &str) -> String {
    if rows.is_empty() {
        return no_data_row(5);
    }
    each_visible(rows, query, teacher_row)
}

fn teacher_row(out: &mut String, row: &TeacherRow, hidden: &str) {
    let _ = write!(
        out,
        r#"<tr class="filterable"{hidden}><td><strong>{}</strong></td><td><strong>{}</strong></td><td><span class="badge badge-info">📱 {}</span></td><td><span class="badge badge-purple">{}</span></td><td><span class="badge badge-success">📅 {} محاضرة</span></td></tr>"#,
        row.index,
        escape(&row.name),
        escape(&row.whatsapp),
        escape(&row.uid_rfid),
        row.session_count
    );
}

fn render_sessions(cards: &[SessionCard], query: &str) -> String {
    if cards.is_empty() {
        return no_data_block();
    }
    each_visible(cards, query, session_card)
}

fn session_card(out: &mut String, card: &SessionCard, hidden: &str) {
    let _ = write!(
        out,
        r#"<div class="session-card filterable"{hidden}>
  <div class="student-header"><div class="student-name">📝 {id}</div><span class="badge {badge}">{icon} {status}</span></div>
  <div class="session-info">
    <div class="detail-item"><div class="detail-label">الدكتور</div><div class="detail-value">👨‍🏫 {teacher}</div></div>
    <div class="detail-item"><div class="detail-label">وقت البداية</div><div class="detail-value">🕐 {start}</div></div>
    <div class="detail-item"><div class="detail-label">وقت النهاية</div><div class="detail-value">🕐 {end}</div></div>
    <div class="detail-item"><div class="detail-label">المدة</div><div class="detail-value">⏱️ {duration} دقيقة</div></div>
    <div class="detail-item"><div class="detail-label">عدد الحضور</div><div class="detail-value" style="color: var(--success)">👥 {count} طالب</div></div>
  </div>
</div>"#,
        id = escape(&card.session_id),
        badge = card.status.badge_class(),
        icon = card.status.icon(),
        status = card.status.label(),
        teacher = escape(&card.teacher_name),
        start = escape(&card.start_time),
        end = escape(&card.end_time),
        duration = card.duration_text(),
        count = card.attendance_count,
    );
}

fn render_attendance(rows: &[AttendanceRow], query: &str) -> String {
    if rows.is_empty() {
        return no_data_row(6);
    }
    each_visible(rows, query, attendance_row)
}

fn attendance_row(out: &mut String, row: &AttendanceRow, hidden: &str) {
    let (badge, icon) = match row.presence {
        Presence::Present => ("badge-success", "✅"),
        Presence::Absent => ("badge-danger", "❌"),
    };
    let _ = write!(
        out,
        r#"<tr class="filterable"{hidden}><td><strong>{}</strong></td><td>{}</td><td><strong>{}</strong></td><td>{}</td><td>{}</td><td><span class="badge {badge}">{icon} {}</span></td></tr>"#,
        row.index,
        escape(&row.session_id),
        escape(&row.student_name),
        escape(&row.teacher_name),
        escape(&row.scan_time),
        row.presence.label()
    );
}

type Painter<T> = fn(&mut String, &T, &str);

/// Renders every item; the ones not matching `query` get the `hidden` attribute.
fn each_visible<T: Searchable>(items: &[T], query: &str, paint: Painter<T>) -> String {
    let mut out = String::new();
    for (item, visible) in items.iter().zip(filter_visibility(items, query)) {
        paint(&mut out, item, if visible { "" } else { " hidden" });
    }
    out
}

impl Searchable for StudentCard {
    fn search_text(&self) -> String {
        painted_text(self, student_card)
    }
}

impl Searchable for TeacherRow {
    fn search_text(&self) -> String {
        painted_text(self, teacher_row)
    }
}

impl Searchable for SessionCard {
    fn search_text(&self) -> String {
        painted_text(self, session_card)
    }
}

impl Searchable for AttendanceRow {
    fn search_text(&self) -> String {
        painted_text(self, attendance_row)
    }
}

/// The text a browser would report as the item's `textContent`.
fn painted_text<T>(item: &T, paint: Painter<T>) -> String {
    let mut html = String::new();
    paint(&mut html, item, "");
    text_content(&html)
}

fn text_content(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        rest = match rest[open..].find('>') {
            Some(close) => &rest[open + close + 1..],
            None => "",
        };
    }
    text.push_str(rest);
    unescape(&text)
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn no_data_block() -> String {
    format!(r#"<div class="loading">{NO_DATA}</div>"#)
}

fn no_data_row(columns: usize) -> String {
    format!(r#"<tr><td colspan="{columns}" class="loading">{NO_DATA}</td></tr>"#)
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Substitutes `{{KEY}}` markers in one pass, so inserted values are never rescanned.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="ar" dir="rtl" data-theme="{{THEME}}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>لوحة متابعة الحضور</title>
  <style>
    :root,
    [data-theme="dark"] {
      --bg: #0f172a;
      --card: #1e293b;
      --ink: #e2e8f0;
      --muted: #94a3b8;
      --border: rgba(148, 163, 184, 0.18);
      --success: #22c55e;
      --danger: #ef4444;
      --warning: #f59e0b;
      --info: #38bdf8;
      --purple: #a78bfa;
      --gradient-2: linear-gradient(180deg, #f87171, #dc2626);
      --gradient-3: linear-gradient(180deg, #fbbf24, #d97706);
      --gradient-4: linear-gradient(180deg, #4ade80, #16a34a);
      --shadow: 0 18px 40px rgba(2, 6, 23, 0.45);
    }

    [data-theme="light"] {
      --bg: #f1f5f9;
      --card: #ffffff;
      --ink: #0f172a;
      --muted: #64748b;
      --border: rgba(15, 23, 42, 0.08);
      --shadow: 0 18px 40px rgba(15, 23, 42, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Cairo", "Segoe UI", Tahoma, sans-serif;
      padding: 28px 18px 48px;
      transition: background 200ms ease, color 200ms ease;
    }

    .app {
      width: min(1200px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      justify-content: space-between;
      gap: 16px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.6rem, 3vw, 2.2rem);
    }

    .theme-toggle {
      appearance: none;
      border: 1px solid var(--border);
      background: var(--card);
      color: var(--ink);
      border-radius: 999px;
      padding: 10px 18px;
      font-size: 0.95rem;
      cursor: pointer;
      display: inline-flex;
      gap: 8px;
      align-items: center;
    }

    .notice {
      background: rgba(239, 68, 68, 0.15);
      border: 1px solid var(--danger);
      color: var(--danger);
      border-radius: 14px;
      padding: 14px 18px;
    }

    .stats {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 16px;
    }

    .stat-card,
    .chart-card,
    .student-card,
    .session-card,
    .table-card {
      background: var(--card);
      border: 1px solid var(--border);
      border-radius: 18px;
      padding: 18px;
      box-shadow: var(--shadow);
    }

    .stat-label,
    .detail-label {
      color: var(--muted);
      font-size: 0.85rem;
    }

    .stat-value {
      font-size: 2rem;
      font-weight: 700;
    }

    .tabs {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
    }

    .tab {
      appearance: none;
      border: 1px solid var(--border);
      background: transparent;
      color: var(--muted);
      border-radius: 999px;
      padding: 10px 16px;
      font-weight: 600;
      cursor: pointer;
    }

    .tab.active {
      background: var(--card);
      color: var(--ink);
      box-shadow: var(--shadow);
    }

    .content-section {
      display: none;
      gap: 18px;
    }

    .content-section.active {
      display: grid;
    }

    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 18px;
    }

    .bar-chart {
      display: flex;
      align-items: flex-end;
      gap: 14px;
      min-height: 300px;
    }

    .bar-item {
      flex: 1;
      display: grid;
      gap: 6px;
      justify-items: center;
    }

    .bar-wrapper {
      height: 240px;
      width: 100%;
      display: flex;
      align-items: flex-end;
      justify-content: center;
    }

    .bar {
      width: 70%;
      border-radius: 10px 10px 4px 4px;
    }

    .bar-label {
      font-size: 0.8rem;
      color: var(--muted);
      text-align: center;
    }

    .pie-chart {
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      gap: 24px;
    }

    .pie-visual {
      width: 200px;
      height: 200px;
      border-radius: 50%;
      background: conic-gradient(var(--success) 0deg var(--present-angle), var(--danger) var(--present-angle) 360deg);
    }

    .pie-legend {
      display: grid;
      gap: 12px;
    }

    .legend-item {
      display: flex;
      gap: 10px;
      align-items: center;
    }

    .legend-color {
      width: 18px;
      height: 18px;
      border-radius: 6px;
    }

    .search-box {
      width: 100%;
      border: 1px solid var(--border);
      background: var(--card);
      color: var(--ink);
      border-radius: 12px;
      padding: 12px 16px;
      font-size: 1rem;
    }

    .cards {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(300px, 1fr));
      gap: 16px;
    }

    .student-header {
      display: flex;
      justify-content: space-between;
      align-items: center;
      gap: 10px;
      margin-bottom: 12px;
    }

    .student-name {
      font-weight: 700;
      font-size: 1.1rem;
    }

    .student-details,
    .session-info {
      display: grid;
      grid-template-columns: repeat(2, 1fr);
      gap: 10px;
    }

    .detail-value {
      font-weight: 600;
    }

    .progress-bar {
      margin-top: 14px;
      height: 8px;
      border-radius: 999px;
      background: var(--border);
      overflow: hidden;
    }

    .progress-fill {
      height: 100%;
    }

    .badge {
      display: inline-block;
      border-radius: 999px;
      padding: 4px 12px;
      font-size: 0.8rem;
      font-weight: 600;
    }

    .badge-success { background: rgba(34, 197, 94, 0.15); color: var(--success); }
    .badge-warning { background: rgba(245, 158, 11, 0.15); color: var(--warning); }
    .badge-danger { background: rgba(239, 68, 68, 0.15); color: var(--danger); }
    .badge-info { background: rgba(56, 189, 248, 0.15); color: var(--info); }
    .badge-purple { background: rgba(167, 139, 250, 0.15); color: var(--purple); }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th,
    td {
      padding: 12px;
      text-align: right;
      border-bottom: 1px solid var(--border);
    }

    .loading {
      text-align: center;
      color: var(--muted);
      padding: 24px;
    }

    [hidden] {
      display: none !important;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>📋 لوحة متابعة الحضور</h1>
      <form id="theme-form" method="post" action="/theme/toggle">
        <button class="theme-toggle" type="submit"><span id="themeIcon">{{THEME_ICON}}</span><span id="themeText">{{THEME_LABEL}}</span></button>
      </form>
    </header>

    {{NOTICE}}

    <section class="stats">{{COUNTERS}}</section>
    <noscript><style>.stat-value { font-size: 0; } .stat-value::after { content: attr(data-target); font-size: 2rem; }</style></noscript>

    <nav class="tabs" role="tablist">{{TABS}}</nav>

    <section id="overview" class="{{OVERVIEW_CLASS}}">
      <div class="charts">
        <div class="chart-card">
          <h2>نسب حضور الطلاب</h2>
          <div id="attendanceChart" class="bar-chart">{{BAR_CHART}}</div>
        </div>
        <div class="chart-card">
          <h2>الحضور والغياب</h2>
          <div id="overviewChart" class="pie-chart">{{OVERVIEW}}</div>
        </div>
      </div>
    </section>

    <section id="students" class="{{STUDENTS_CLASS}}">
      <input class="search-box" type="search" placeholder="🔍 ابحث عن طالب..." value="{{STUDENTS_QUERY}}" data-filter="studentsContainer" />
      <div id="studentsContainer" class="cards">{{STUDENTS}}</div>
    </section>

    <section id="teachers" class="{{TEACHERS_CLASS}}">
      <input class="search-box" type="search" placeholder="🔍 ابحث عن دكتور..." value="{{TEACHERS_QUERY}}" data-filter="teachersBody" />
      <div class="table-card">
        <table id="teachersTable">
          <thead><tr><th>#</th><th>الاسم</th><th>WhatsApp</th><th>RFID</th><th>المحاضرات</th></tr></thead>
          <tbody id="teachersBody">{{TEACHERS}}</tbody>
        </table>
      </div>
    </section>

    <section id="sessions" class="{{SESSIONS_CLASS}}">
      <input class="search-box" type="search" placeholder="🔍 ابحث عن محاضرة..." value="{{SESSIONS_QUERY}}" data-filter="sessionsContainer" />
      <div id="sessionsContainer" class="cards">{{SESSIONS}}</div>
    </section>

    <section id="attendance" class="{{ATTENDANCE_CLASS}}">
      <input class="search-box" type="search" placeholder="🔍 ابحث في سجل الحضور..." value="{{ATTENDANCE_QUERY}}" data-filter="attendanceBody" />
      <div class="table-card">
        <table id="attendanceTable">
          <thead><tr><th>#</th><th>المحاضرة</th><th>الطالب</th><th>الدكتور</th><th>وقت التسجيل</th><th>الحالة</th></tr></thead>
          <tbody id="attendanceBody">{{ATTENDANCE}}</tbody>
        </table>
      </div>
    </section>
  </main>

  <script>
    const tabs = Array.from(document.querySelectorAll('.tab'));
    const sections = Array.from(document.querySelectorAll('.content-section'));

    const switchTab = (name) => {
      tabs.forEach((tab) => tab.classList.toggle('active', tab.dataset.tab === name));
      sections.forEach((section) => section.classList.toggle('active', section.id === name));
      const url = new URL(window.location.href);
      url.searchParams.set('tab', name);
      url.searchParams.delete('q');
      history.replaceState(null, '', url);
    };

    tabs.forEach((tab) => {
      tab.addEventListener('click', () => switchTab(tab.dataset.tab));
    });

    document.querySelectorAll('[data-filter]').forEach((input) => {
      const container = document.getElementById(input.dataset.filter);
      input.addEventListener('input', () => {
        const query = input.value.toLowerCase();
        container.querySelectorAll('.filterable').forEach((item) => {
          item.hidden = !item.textContent.toLowerCase().includes(query);
        });
      });
    });

    const themeForm = document.getElementById('theme-form');
    themeForm.addEventListener('submit', async (event) => {
      event.preventDefault();
      const res = await fetch('/api/theme/toggle', { method: 'POST' });
      if (!res.ok) {
        return;
      }
      const state = await res.json();
      document.documentElement.setAttribute('data-theme', state.theme);
      document.getElementById('themeIcon').textContent = state.icon;
      document.getElementById('themeText').textContent = state.label;
    });

    const settleCounters = () => {
      document.querySelectorAll('.stat-value[data-target]').forEach((el) => {
        el.textContent = el.dataset.target;
      });
    };

    if (window.EventSource) {
      const counters = new EventSource('/api/counters/stream');
      counters.addEventListener('counter', (event) => {
        const frame = JSON.parse(event.data);
        const el = document.getElementById(frame.counter);
        if (el) {
          el.textContent = frame.value;
        }
      });
      counters.addEventListener('done', () => counters.close());
      counters.onerror = () => {
        counters.close();
        settleCounters();
      };
    } else {
      settleCounters();
    }

    const notice = document.getElementById('notice');
    if (notice) {
      alert(notice.textContent);
    }
  </script>
</body>
</html>
"#;
