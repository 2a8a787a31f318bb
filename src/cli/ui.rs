use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

use rust_decimal::prelude::ToPrimitive;

use crate::analytics;
use crate::cli::api::local_dashboard;
use crate::cli::state::{App, BudgetField, GoalField, LoginField, Screen, SettingsField, Tab, TxnField};
use crate::cli::util::{iso, progress_bar, short_date};
use crate::database::models::UserSettings;

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.size();

    if app.screen == Screen::Login {
        draw_login(f, size, app);
        return;
    }

    // top tabs | main content | status line
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(1)])
        .split(size);

    let titles = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(Span::raw(format!("{} {}", i + 1, t.title()))))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).title("Finance Tracker"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(tabs, root[0]);

    match app.tab {
        Tab::Dashboard => draw_dashboard(f, root[1], app),
        Tab::Transactions => draw_txns(f, root[1], app),
        Tab::Budget => draw_budget(f, root[1], app),
        Tab::Goals => draw_goals(f, root[1], app),
        Tab::Settings => draw_settings(f, root[1], app),
        Tab::Help => draw_help(f, root[1]),
    }

    f.render_widget(
        Paragraph::new(app.status.as_str()).style(Style::default().add_modifier(Modifier::DIM)),
        root[2],
    );

    if app.tab == Tab::Transactions && app.txn.form.is_some() {
        let area = center_rect(root[1], 60, 13);
        f.render_widget(Clear, area);
        draw_txn_modal(f, area, app);
    }
}

fn editing_marker(active: bool) -> &'static str {
    if active { "  <editing>" } else { "" }
}

fn error_line(error: &Option<String>) -> Line<'static> {
    match error {
        Some(e) => Line::styled(format!("Error: {e}"), Style::default().fg(Color::Red)),
        None => Line::raw(""),
    }
}

// Login

fn draw_login(f: &mut Frame, size: Rect, app: &App) {
    let form = &app.login;
    let area = center_rect(size, 56, if form.signing_up { 12 } else { 11 });
    let mark = |field: LoginField| if form.focus == Some(field) { "> " } else { "  " };

    let mut lines = vec![
        Line::raw(format!("{}Email    : {}", mark(LoginField::Email), form.email.rendered())),
        Line::raw(format!("{}Password : {}", mark(LoginField::Password), form.password.rendered())),
    ];
    if form.signing_up {
        lines.push(Line::raw(format!("{}Name     : {}", mark(LoginField::Name), form.name.rendered())));
    }
    lines.extend([
        Line::raw(""),
        Line::raw("Tab: next field | Enter: submit"),
        Line::raw(if form.signing_up {
            "F2: have an account? Sign in"
        } else {
            "F2: new here? Create an account"
        }),
        Line::raw("Esc: quit"),
        Line::raw(""),
        error_line(&form.error),
    ]);

    let title = if form.signing_up { "Create Account" } else { "Sign In" };
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false }),
        area,
    );
}

// Dashboard

fn draw_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let settings = &app.settings.draft;
    let dash = match local_dashboard(&app.txn.list, &app.budget.list, &app.goals.list, settings) {
        Ok(dash) => dash,
        Err(e) => {
            let p = Paragraph::new(error_line(&Some(e.to_string())))
                .block(Block::default().borders(Borders::ALL).title("Dashboard"));
            f.render_widget(p, area);
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(8)])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
        ])
        .split(rows[0]);

    let done = dash.goals.iter().filter(|g| g.completed).count();
    let figures = [
        ("Balance", settings.format_amount(dash.summary.balance), Color::Cyan),
        ("Income", settings.format_amount(dash.summary.income), Color::Green),
        ("Expenses", settings.format_amount(dash.summary.expenses), Color::Red),
        ("Goals", format!("{done}/{} complete", dash.goals.len()), Color::Yellow),
    ];
    for ((title, value, color), slot) in figures.into_iter().zip(cards.iter()) {
        let p = Paragraph::new(Line::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, *slot);
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    // whole currency units
    let trend: Vec<(&str, u64)> = dash
        .trend
        .iter()
        .map(|p| (p.day.as_str(), p.amount.to_u64().unwrap_or(0)))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Spending, last 7 days"))
        .data(trend.as_slice())
        .bar_width(5)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Magenta))
        .value_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(chart, cols[0]);

    let mut items: Vec<ListItem> = dash
        .breakdown
        .iter()
        .map(|c| {
            ListItem::new(format!(
                "{:<14} {:>12}  {:>5.1}%",
                c.category,
                settings.format_amount(c.amount),
                c.percent
            ))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No expenses yet"));
    }
    let alerts = &dash.alerts;
    if alerts.enabled && (alerts.daily_exceeded || alerts.monthly_exceeded) {
        items.push(ListItem::new(""));
        let which = if alerts.monthly_exceeded { "Monthly" } else { "Daily" };
        items.push(ListItem::new(Line::styled(
            format!("{which} budget limit exceeded"),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("By category")),
        cols[1],
    );
}

// Transactions

fn draw_txns(f: &mut Frame, area: Rect, app: &mut App) {
    let settings = &app.settings.draft;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let s = analytics::summarize(&app.txn.list);
    let summary = Paragraph::new(format!(
        "Income {}   Expenses {}   Balance {}   ({} records)",
        settings.format_amount(s.income),
        settings.format_amount(s.expenses),
        settings.format_amount(s.balance),
        app.txn.list.len()
    ))
    .block(Block::default().borders(Borders::ALL).title("Summary"));
    f.render_widget(summary, rows[0]);

    let header = Row::new(vec!["Date", "Description", "Category", "Type", "Amount"]).height(1);
    let body: Vec<Row> = app
        .txn
        .list
        .iter()
        .map(|t| {
            let sign = if t.is_income() { "+" } else { "-" };
            let color = if t.is_income() { Color::Green } else { Color::Red };
            Row::new(vec![
                Cell::from(short_date(&t.date)),
                Cell::from(t.description.clone()),
                Cell::from(t.category.clone()),
                Cell::from(t.kind.as_str()),
                Cell::from(format!("{sign}{}", settings.format_amount(t.amount)))
                    .style(Style::default().fg(color)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Percentage(40),
        Constraint::Length(14),
        Constraint::Length(8),
        Constraint::Length(16),
    ];

    let table = Table::new(body, widths)
        .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Transactions  (a add, e/Enter edit, x delete)"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    f.render_stateful_widget(table, rows[1], &mut app.txn.tsel);
}

fn draw_txn_modal(f: &mut Frame, area: Rect, app: &App) {
    let Some(form) = app.txn.form.as_ref() else { return };
    let on = |field: TxnField| editing_marker(form.focus == field);

    let lines = vec![
        Line::raw(format!("Date        : {}{}", form.date.rendered(), on(TxnField::Date))),
        Line::raw(format!("Description : {}{}", form.description.rendered(), on(TxnField::Description))),
        Line::raw(format!("Category    : {}{}", form.category.rendered(), on(TxnField::Category))),
        Line::raw(format!("Type        : {}{}", form.kind, on(TxnField::Kind))),
        Line::raw(format!("Amount      : {}{}", form.amount.rendered(), on(TxnField::Amount))),
        Line::raw(""),
        Line::raw("Tab/↑/↓: field | ←/→/Space: toggle type"),
        Line::raw("Enter: save | Esc: cancel"),
        Line::raw(""),
        error_line(&form.error),
    ];
    let title = if form.editing_id.is_some() { "Edit Transaction" } else { "Add Transaction" };
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

// Budget

fn draw_budget(f: &mut Frame, area: Rect, app: &mut App) {
    let settings = &app.settings.draft;
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let items: Vec<ListItem> = app
        .budget
        .list
        .iter()
        .map(|b| {
            let p = analytics::budget_progress(b, &app.txn.list);
            let style = if p.over_limit {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::new(vec![
                Line::raw(format!(
                    "{}  {} of {}",
                    b.category,
                    settings.format_amount(p.spent),
                    settings.format_amount(b.limit)
                )),
                Line::styled(format!("  {} {:.0}%", progress_bar(p.percent, 24), p.percent), style),
            ])
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Budgets  (a add, x remove)"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, cols[0], &mut app.budget.sel);

    let form = &app.budget;
    let lines = vec![
        Line::raw(format!(
            "Category : {}{}",
            form.category.rendered(),
            editing_marker(form.editing == Some(BudgetField::Category))
        )),
        Line::raw(format!(
            "Limit    : {}{}",
            form.limit.rendered(),
            editing_marker(form.editing == Some(BudgetField::Limit))
        )),
        Line::raw(""),
        Line::raw(if form.editing.is_some() {
            "Tab: switch | Enter: add | Esc: cancel"
        } else {
            "Press a to add a budget"
        }),
        Line::raw(""),
        error_line(&form.error),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("New Budget"))
            .wrap(Wrap { trim: true }),
        cols[1],
    );
}

// Goals

fn draw_goals(f: &mut Frame, area: Rect, app: &mut App) {
    let settings = &app.settings.draft;
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let items: Vec<ListItem> = app
        .goals
        .list
        .iter()
        .map(|g| {
            let p = analytics::goal_progress(g);
            let tail = if p.completed {
                "done".to_string()
            } else {
                format!("{} to go", settings.format_amount(p.remaining))
            };
            ListItem::new(vec![
                Line::raw(format!(
                    "{}  {} / {}  ({tail})",
                    g.title,
                    settings.format_amount(g.saved),
                    settings.format_amount(g.target)
                )),
                Line::raw(format!("  {} {:.0}%", progress_bar(p.percent, 24), p.percent)),
            ])
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Savings Goals  (a add, c contribute, x delete)"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, cols[0], &mut app.goals.sel);

    let form = &app.goals;
    let lines = if form.editing == Some(GoalField::Contribution) {
        vec![
            Line::raw(format!("Amount : {}  <editing>", form.contribution.rendered())),
            Line::raw(""),
            Line::raw("Enter: add to goal | Esc: cancel"),
            Line::raw(""),
            error_line(&form.error),
        ]
    } else {
        vec![
            Line::raw(format!(
                "Title  : {}{}",
                form.title.rendered(),
                editing_marker(form.editing == Some(GoalField::Title))
            )),
            Line::raw(format!(
                "Target : {}{}",
                form.target.rendered(),
                editing_marker(form.editing == Some(GoalField::Target))
            )),
            Line::raw(""),
            Line::raw(if form.editing.is_some() {
                "Tab: switch | Enter: add | Esc: cancel"
            } else {
                "Press a to add a goal"
            }),
            Line::raw(""),
            error_line(&form.error),
        ]
    };
    let title = if form.editing == Some(GoalField::Contribution) { "Contribute" } else { "New Goal" };
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true }),
        cols[1],
    );
}

// Settings

fn settings_line(field: SettingsField, settings: &UserSettings, editing: Option<String>) -> Line<'static> {
    let value = editing.map_or_else(|| field.value(settings), |v| format!("{v}  <editing>"));
    Line::from(vec![
        Span::styled(format!("{:<20}", field.label()), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

fn draw_settings(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(4)])
        .split(area);

    let page = &app.settings;
    let current = page.current_field();
    let items: Vec<ListItem> = SettingsField::ALL
        .iter()
        .map(|field| {
            let editing = page
                .editing
                .as_ref()
                .filter(|_| *field == current)
                .map(|e| e.rendered());
            ListItem::new(settings_line(*field, &page.draft, editing))
        })
        .collect();

    let title = if page.dirty { "Settings (unsaved changes)" } else { "Settings" };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, rows[0], &mut app.settings.sel);

    let updated = app
        .settings
        .draft
        .updated_at
        .map(|t| format!("Last saved {}", iso(&t.date_naive())))
        .unwrap_or_else(|| "Never saved".into());
    let footer = vec![
        Line::raw(format!("Enter: edit/toggle | ←/→: cycle | s: save | r: reload | {updated}")),
        error_line(&app.settings.error),
    ];
    f.render_widget(
        Paragraph::new(footer).block(Block::default().borders(Borders::TOP)),
        rows[1],
    );
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help_text = [
        "Global Keys:",
        "  q / Ctrl+c : Quit",
        "  Tab        : Next tab (Shift+Tab previous)",
        "  1-6        : Jump to tab",
        "  ?          : This help",
        "  o          : Sign out",
        "",
        "Dashboard:",
        "  r        : Reload budgets and goals",
        "",
        "Transactions:",
        "  Up/Down  : Navigate list",
        "  a        : Add transaction",
        "  e/Enter  : Edit selected",
        "  x/Del    : Delete selected",
        "",
        "Budget / Goals:",
        "  a        : Add",
        "  c/Enter  : Contribute to selected goal",
        "  x/Del    : Remove selected",
        "",
        "Settings:",
        "  Enter    : Edit text field or toggle flag",
        "  Left/Right: Cycle currency, timezone, language",
        "  s        : Save | r : Discard and reload",
    ]
    .join("\n");

    let p = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help & Keybindings"));

    f.render_widget(p, area);
}

fn center_rect(rect: Rect, w: u16, h: u16) -> Rect {
    let x = rect.x + rect.width.saturating_sub(w) / 2;
    let y = rect.y + rect.height.saturating_sub(h) / 2;
    Rect { x, y, width: w.min(rect.width), height: h.min(rect.height) }
}
