//! Ratatui-based terminal UI.
//!
//! A single page: the applicant form on the left, the decision and its
//! explanation on the right. Every edit re-runs the pipeline synchronously.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::pipeline::{Assessment, assess};
use crate::artifacts::ArtifactStore;
use crate::domain::{
    AGE_RANGE, ApplicantRecord, AttributionResult, CREDIT_AMOUNT_RANGE, Choice, DURATION_RANGE, Field,
    RiskLabel,
};
use crate::error::{AppError, PipelineError};

mod plotters_chart;

use plotters_chart::ContributionChart;

/// Contributions shown in the chart.
const CHART_TOP_N: usize = 5;
const CREDIT_STEP: f64 = 250.0;

/// Form rows, in display order.
const FORM_FIELDS: [Field; 9] = [
    Field::Age,
    Field::Sex,
    Field::Job,
    Field::Housing,
    Field::SavingAccounts,
    Field::CheckingAccount,
    Field::CreditAmount,
    Field::Duration,
    Field::Purpose,
];

/// Start the TUI. Artifacts are loaded before the terminal is taken over, so
/// a load failure is printed normally.
pub fn run(store: ArtifactStore) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(store);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    store: ArtifactStore,
    record: ApplicantRecord,
    selected_field: usize,
    editing_amount: bool,
    amount_input: String,
    show_waterfall: bool,
    show_force: bool,
    status: String,
    result: Result<Assessment, PipelineError>,
}

impl App {
    fn new(store: ArtifactStore) -> Self {
        let record = ApplicantRecord::default();
        let result = assess(&record, &store);
        Self {
            store,
            record,
            selected_field: 0,
            editing_amount: false,
            amount_input: String::new(),
            show_waterfall: false,
            show_force: false,
            status: "Ready.".to_string(),
            result,
        }
    }

    fn selected(&self) -> Field {
        FORM_FIELDS[self.selected_field]
    }

    /// One synchronous pipeline run for the current form state.
    fn recompute(&mut self) {
        self.result = assess(&self.record, &self.store);
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_amount {
            self.handle_amount_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FORM_FIELDS.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => {
                if self.selected() == Field::CreditAmount {
                    self.editing_amount = true;
                    self.amount_input.clear();
                    self.status = "Type the credit amount. Enter to apply, Esc to cancel.".to_string();
                }
            }
            KeyCode::Char('w') => {
                self.show_waterfall = !self.show_waterfall;
            }
            KeyCode::Char('f') => {
                self.show_force = !self.show_force;
            }
            KeyCode::Char('r') => {
                self.record = ApplicantRecord::default();
                self.recompute();
                self.status = "Form reset.".to_string();
            }
            KeyCode::Char('d') => {
                self.status = match &self.result {
                    Ok(assessment) => match crate::debug::write_debug_bundle(assessment, &self.store) {
                        Ok(path) => format!("Wrote debug bundle: {}", path.display()),
                        Err(err) => format!("Debug write failed: {err}"),
                    },
                    Err(_) => "Nothing to debug: the current record could not be scored.".to_string(),
                };
            }
            _ => {}
        }

        false
    }

    fn handle_amount_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_amount = false;
                self.status = "Amount edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_amount = false;
                self.apply_amount_input();
            }
            KeyCode::Backspace => {
                self.amount_input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == '.' {
                    self.amount_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn apply_amount_input(&mut self) {
        let trimmed = self.amount_input.trim();
        match trimmed.parse::<f64>() {
            Ok(amount) => {
                // Out-of-range amounts go through the pipeline and surface inline.
                self.record.credit_amount = amount;
                self.recompute();
                self.status = format!("credit amount: {amount}");
            }
            Err(e) => {
                self.status = format!("Invalid amount '{trimmed}': {e}");
            }
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        let field = self.selected();
        let r = &mut self.record;
        match field {
            Field::Age => r.age = step_u32(r.age, delta, AGE_RANGE),
            Field::Job => r.job = cycle(r.job, delta),
            Field::Sex => r.sex = cycle(r.sex, delta),
            Field::Housing => r.housing = cycle(r.housing, delta),
            Field::SavingAccounts => r.saving_accounts = cycle(r.saving_accounts, delta),
            Field::CheckingAccount => r.checking_account = cycle(r.checking_account, delta),
            Field::CreditAmount => {
                let (lo, hi) = CREDIT_AMOUNT_RANGE;
                r.credit_amount = (r.credit_amount + f64::from(delta) * CREDIT_STEP).clamp(lo, hi);
            }
            Field::Duration => r.duration = step_u32(r.duration, delta, DURATION_RANGE),
            Field::Purpose => r.purpose = cycle(r.purpose, delta),
        }
        self.recompute();
        self.status = format!("{field}: {}", field_value(&self.record, field));
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let classifier = self.store.classifier();
        let mut lines: Vec<Line> = vec![Line::from(vec![
            Span::styled("risk", Style::default().fg(Color::Cyan)),
            Span::raw(" - credit risk scoring"),
        ])];
        lines.push(Line::from(Span::styled(
            format!(
                "model: {} | features: {} | contributions in log-odds",
                classifier.model.display_name(),
                classifier.n_features()
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(42), Constraint::Min(0)])
            .split(area);

        self.draw_form(frame, chunks[0]);
        self.draw_results(frame, chunks[1]);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = FORM_FIELDS
            .iter()
            .map(|&field| {
                let value = if field == Field::CreditAmount && self.editing_amount {
                    format!("{}_", self.amount_input)
                } else {
                    field_value(&self.record, field)
                };
                ListItem::new(format!("{:<17} {value}", field.column_name()))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Applicant").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);

        if self.editing_amount {
            let hint = Paragraph::new("Editing credit amount…")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rect = Rect {
                x: area.x + 2,
                y: area.y + area.height.saturating_sub(2),
                width: area.width.saturating_sub(4),
                height: 1,
            };
            frame.render_widget(hint, rect);
        }
    }

    fn draw_results(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let assessment = match &self.result {
            Ok(a) => a,
            Err(err) => {
                let msg = Paragraph::new(format!("Cannot score this record:\n{err}"))
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true })
                    .block(Block::default().title("Result").borders(Borders::ALL));
                frame.render_widget(msg, area);
                return;
            }
        };

        let mut constraints = vec![Constraint::Length(5), Constraint::Min(8)];
        if self.show_waterfall {
            constraints.push(Constraint::Length(CHART_TOP_N as u16 + 5));
        }
        if self.show_force {
            constraints.push(Constraint::Length(4));
        }
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.draw_prediction(frame, chunks[0], assessment);

        match &assessment.attribution {
            Ok(attribution) => {
                draw_chart(frame, chunks[1], attribution);
                let mut next = 2;
                if self.show_waterfall {
                    let text = crate::report::format_waterfall(attribution, CHART_TOP_N);
                    let p = Paragraph::new(text)
                        .block(Block::default().title("Waterfall").borders(Borders::ALL));
                    frame.render_widget(p, chunks[next]);
                    next += 1;
                }
                if self.show_force {
                    let text = crate::report::format_force(attribution, 3);
                    let p = Paragraph::new(text)
                        .wrap(Wrap { trim: true })
                        .block(Block::default().title("Force").borders(Borders::ALL));
                    frame.render_widget(p, chunks[next]);
                }
            }
            Err(err) => {
                let msg = Paragraph::new(format!("Explanation unavailable: {err}"))
                    .style(Style::default().fg(Color::Yellow))
                    .wrap(Wrap { trim: true })
                    .block(Block::default().title("Top risk drivers").borders(Borders::ALL));
                frame.render_widget(msg, chunks[1]);
            }
        }
    }

    fn draw_prediction(&self, frame: &mut ratatui::Frame<'_>, area: Rect, assessment: &Assessment) {
        let outcome = &assessment.outcome;
        let (text, color) = match outcome.label {
            RiskLabel::Bad => ("Bad credit risk", Color::Red),
            RiskLabel::Good => ("Good credit risk", Color::Green),
        };
        let lines = vec![
            Line::from(Span::styled(
                text,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Probability of bad credit: {:.1}%", outcome.probability * 100.0)),
            Line::from(Span::styled(
                format!("raw score {:+.4}", outcome.raw_score),
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines))
            .block(Block::default().title("Prediction").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter type amount  w waterfall  f force  r reset  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, attribution: &AttributionResult) {
    let block = Block::default()
        .title("Top risk drivers (red: toward bad, green: toward good)")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let (names, values, x_bounds) = chart_bars(attribution, CHART_TOP_N);
    if values.is_empty() {
        frame.render_widget(Paragraph::new("No features to explain."), inner);
        return;
    }

    let label_width = 26u16.min(inner.width / 3);
    let chart_rect = Rect {
        x: inner.x + label_width,
        y: inner.y,
        width: inner.width.saturating_sub(label_width),
        height: inner.height,
    };
    frame.render_widget(
        ContributionChart {
            values: &values,
            x_bounds,
            fmt_x: fmt_axis_x,
        },
        chart_rect,
    );

    // Feature names next to their bars. Plotters keeps a 1-cell margin and a
    // 3-row x-label area, so bars live in the remaining band.
    let band_top = inner.y + 1;
    let band_height = inner.height.saturating_sub(5);
    if band_height == 0 {
        return;
    }
    let style = Style::default().fg(Color::Gray);
    for (i, name) in names.iter().enumerate() {
        let u = (i as f64 + 0.5) / names.len() as f64;
        let y = band_top + (u * band_height as f64).floor() as u16;
        let label: String = name.chars().take(label_width.saturating_sub(1) as usize).collect();
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: inner.x,
                y,
                width: label_width,
                height: 1,
            },
        );
    }
}

/// Names, values and symmetric x bounds for the top-N bars.
fn chart_bars(attribution: &AttributionResult, top_n: usize) -> (Vec<String>, Vec<f64>, [f64; 2]) {
    let top = attribution.top_k(top_n);
    let names = top.iter().map(|c| c.feature.clone()).collect();
    let values: Vec<f64> = top.iter().map(|c| c.contribution).collect();
    let max_abs = values
        .iter()
        .map(|v| v.abs())
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let m = if max_abs > 0.0 { max_abs * 1.1 } else { 1.0 };
    (names, values, [-m, m])
}

fn cycle<T: Choice>(value: T, delta: i32) -> T {
    if delta >= 0 { value.next() } else { value.prev() }
}

fn step_u32(value: u32, delta: i32, (lo, hi): (u32, u32)) -> u32 {
    value.saturating_add_signed(delta).clamp(lo, hi)
}

fn field_value(record: &ApplicantRecord, field: Field) -> String {
    match field {
        Field::Age => record.age.to_string(),
        Field::Job => record.job.display_name().to_string(),
        Field::Sex => record.sex.display_name().to_string(),
        Field::Housing => record.housing.display_name().to_string(),
        Field::SavingAccounts => record.saving_accounts.display_name().to_string(),
        Field::CheckingAccount => record.checking_account.display_name().to_string(),
        Field::CreditAmount => format!("{:.0}", record.credit_amount),
        Field::Duration => format!("{} months", record.duration),
        Field::Purpose => record.purpose.display_name().to_string(),
    }
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:+.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ClassifierModel, ColumnEncoder, FittedClassifier, FittedTransform, LogisticModel, Node, Tree, TreeEnsemble};
    use crate::domain::{Housing, JobLevel};

    fn store() -> ArtifactStore {
        let t = FittedTransform::new(vec![
            ColumnEncoder::Standard {
                field: Field::Duration,
                mean: 20.0,
                scale: 10.0,
            },
            ColumnEncoder::Passthrough { field: Field::Age },
        ]);
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                    cover: 10.0,
                },
                Node::Leaf { value: -0.3, cover: 6.0 },
                Node::Leaf { value: 0.4, cover: 4.0 },
            ],
        };
        let c = FittedClassifier::new(
            t.feature_names(),
            ClassifierModel::TreeEnsemble(TreeEnsemble {
                base_score: 0.0,
                trees: vec![tree],
            }),
        );
        ArtifactStore::from_parts(t, c).unwrap()
    }

    fn select(app: &mut App, field: Field) {
        app.selected_field = FORM_FIELDS.iter().position(|f| *f == field).unwrap();
    }

    #[test]
    fn arrows_edit_and_recompute() {
        let mut app = App::new(store());
        assert!(app.result.is_ok());

        select(&mut app, Field::Housing);
        assert!(!app.handle_key(KeyCode::Right));
        assert_eq!(app.record.housing, Housing::Free);

        select(&mut app, Field::Job);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.record.job, JobLevel::HighlySkilled);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.record.job, JobLevel::UnskilledNonResident);

        select(&mut app, Field::Age);
        for _ in 0..100 {
            app.handle_key(KeyCode::Right);
        }
        assert_eq!(app.record.age, AGE_RANGE.1);
    }

    #[test]
    fn typed_amount_out_of_range_shows_inline_error() {
        let mut app = App::new(store());
        select(&mut app, Field::CreditAmount);
        app.handle_key(KeyCode::Enter);
        assert!(app.editing_amount);
        for c in "50".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        // 'q' while typing is ignored, not a quit.
        assert!(!app.handle_key(KeyCode::Char('q')));
        app.handle_key(KeyCode::Enter);

        assert!(!app.editing_amount);
        assert_eq!(app.record.credit_amount, 50.0);
        assert!(matches!(app.result, Err(PipelineError::InvalidRecord(_))));

        app.handle_key(KeyCode::Char('r'));
        assert!(app.result.is_ok());
    }

    #[test]
    fn attribution_failure_keeps_prediction() {
        let (t, _) = store().into_parts();
        let c = FittedClassifier::new(
            t.feature_names(),
            ClassifierModel::Logistic(LogisticModel {
                intercept: 0.0,
                coefficients: vec![0.5, 0.0],
            }),
        );
        let app = App::new(ArtifactStore::from_parts(t, c).unwrap());
        let a = app.result.as_ref().unwrap();
        assert!(a.attribution.is_err());
    }

    #[test]
    fn panels_toggle_and_quit() {
        let mut app = App::new(store());
        app.handle_key(KeyCode::Char('w'));
        app.handle_key(KeyCode::Char('f'));
        assert!(app.show_waterfall && app.show_force);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn chart_bars_are_symmetric() {
        let a = store();
        let assessment = assess(&ApplicantRecord::default(), &a).unwrap();
        let (names, values, bounds) = chart_bars(assessment.attribution.as_ref().unwrap(), CHART_TOP_N);
        assert_eq!(names[0], "Duration");
        assert_eq!(values.len(), 2);
        assert_eq!(bounds[0], -bounds[1]);
        assert!(bounds[1] > values[0].abs());
    }
}
