//! JSON Diagram - interactive diagram viewer for JSON and XML documents
//! Built with egui for native Wayland support

use eframe::egui::{self, Color32, RichText, Stroke};
use json_diagram::config::{DiagramConfig, ThemeVariant};
use json_diagram::diagram::metrics::EguiMetrics;
use json_diagram::diagram::{Action, DiagramViewer, DocumentFormat, SearchObserver};
use json_diagram::Session;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

/// Standard spacing between elements within a section
const ELEMENT_SPACING: f32 = 8.0;

const SAMPLE_DOCUMENT: &str = r#"{
  "name": "json-diagram",
  "version": 1,
  "stable": true,
  "owner": {"login": "ada", "admin": false, "email": null},
  "tags": ["json", "xml", "diagram"]
}"#;

/// Search counter shared with the toolbar
#[derive(Clone, Default)]
struct SearchCounter(Rc<Cell<(usize, usize)>>);

impl SearchObserver for SearchCounter {
    fn on_search_update(&mut self, current: usize, total: usize) {
        self.0.set((current, total));
    }

    fn on_search_clear(&mut self) {
        self.0.set((0, 0));
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("JSON Diagram"),
        ..Default::default()
    };

    eframe::run_native(
        "JSON Diagram",
        options,
        Box::new(move |cc| {
            let mut style = (*cc.egui_ctx.style()).clone();
            style.visuals.widgets.active.bg_fill = Color32::from_rgb(0, 120, 212);
            style.visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, Color32::from_rgb(0, 120, 212));
            cc.egui_ctx.set_style(style);

            Ok(Box::new(DiagramApp::new(&cc.egui_ctx, path)))
        }),
    )
}

struct DiagramApp {
    session: Session,
    viewer: DiagramViewer,
    counter: SearchCounter,
    editor_text: String,
    search_query: String,
    /// Query the current search results belong to
    searched_query: String,
    current_path: Option<PathBuf>,
    status_message: Option<String>,
    editor_width: f32,
}

impl DiagramApp {
    fn new(ctx: &egui::Context, path: Option<PathBuf>) -> Self {
        let config = DiagramConfig::load();
        let counter = SearchCounter::default();
        let session = Session::new(
            config.clone(),
            Box::new(EguiMetrics::new(ctx)),
            Box::new(counter.clone()),
        );
        let viewer = DiagramViewer::new(*session.theme(), config.metrics.clone());

        let mut app = Self {
            session,
            viewer,
            counter,
            editor_text: String::new(),
            search_query: String::new(),
            searched_query: String::new(),
            current_path: None,
            status_message: None,
            editor_width: 420.0,
        };

        match path {
            Some(path) => app.open_path(path),
            None => app.load_text(SAMPLE_DOCUMENT.to_string(), DocumentFormat::Json),
        }
        app
    }

    fn load_text(&mut self, text: String, format: DocumentFormat) {
        self.editor_text = text.clone();
        if let Err(e) = self.session.load(text, format) {
            self.status_message = Some(e.to_string());
        }
        self.viewer.fit_to_view(self.session.layout());
    }

    fn open_path(&mut self, path: PathBuf) {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentFormat::from_extension)
            .unwrap_or(self.session.config().default_format);

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::info!("Opened {}", path.display());
                self.load_text(text, format);
                self.current_path = Some(path);
            }
            Err(e) => {
                log::warn!("Failed to open {}: {}", path.display(), e);
                self.status_message = Some(format!("Failed to open {}: {}", path.display(), e));
            }
        }
    }

    fn open_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Documents", &["json", "xml"])
            .pick_file();
        if let Some(path) = picked {
            self.open_path(path);
        }
    }

    fn save_dialog(&mut self) {
        let format = self.session.format();
        let picked = rfd::FileDialog::new()
            .add_filter(format.name(), &[format.extension()])
            .set_file_name(format!("document.{}", format.extension()))
            .save_file();
        let Some(path) = picked else {
            return;
        };

        match std::fs::write(&path, self.session.text()) {
            Ok(()) => {
                log::info!("Saved {}", path.display());
                self.status_message = Some(format!("Saved {}", path.display()));
                self.current_path = Some(path);
            }
            Err(e) => self.status_message = Some(format!("Failed to save: {}", e)),
        }
    }

    fn dispatch(&mut self, ctx: &egui::Context, actions: Vec<Action>) {
        for action in actions {
            let refreshes_text = matches!(action, Action::ConvertTo(_));
            let settles_later = action.changes_geometry();
            if let Action::SetTheme(variant) = &action {
                ctx.set_visuals(match variant {
                    ThemeVariant::Dark => egui::Visuals::dark(),
                    ThemeVariant::Light => egui::Visuals::light(),
                });
            }

            match self.session.apply(action) {
                Ok(()) => {
                    if refreshes_text {
                        self.editor_text = self.session.text().to_string();
                    }
                }
                Err(e) if e.is_invalid_content() => {}
                Err(e) => self.status_message = Some(e.to_string()),
            }

            self.viewer.theme = *self.session.theme();
            if settles_later {
                ctx.request_repaint();
            }
        }

        for task in self.session.take_tasks() {
            self.viewer.apply_task(&task, self.session.layout());
        }
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.horizontal(|ui| {
            if ui.button("📂 Open").on_hover_text("Open file (Ctrl+O)").clicked() {
                self.open_dialog();
            }
            if ui.button("💾 Save").on_hover_text("Save file (Ctrl+S)").clicked() {
                self.save_dialog();
            }
            ui.separator();

            let current = self.session.format();
            egui::ComboBox::from_id_salt("format")
                .selected_text(current.name())
                .show_ui(ui, |ui| {
                    for &format in DocumentFormat::all() {
                        if ui.selectable_label(format == current, format.name()).clicked() && format != current {
                            actions.push(Action::SetFormat(format));
                        }
                    }
                });
            for &format in DocumentFormat::all() {
                if format != current && ui.button(format!("→ {}", format.name())).clicked() {
                    actions.push(Action::ConvertTo(format));
                }
            }
            ui.separator();

            let search = ui.add(
                egui::TextEdit::singleline(&mut self.search_query)
                    .hint_text("Search")
                    .desired_width(180.0),
            );
            if search.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                if self.search_query == self.searched_query && !self.search_query.is_empty() {
                    actions.push(Action::NextMatch);
                } else {
                    self.searched_query = self.search_query.clone();
                    actions.push(Action::Search(self.search_query.clone()));
                }
                search.request_focus();
            }
            let (current, total) = self.counter.0.get();
            ui.label(format!("{}/{}", current, total));
            if ui.small_button("✕").on_hover_text("Clear search").clicked() {
                self.search_query.clear();
                self.searched_query.clear();
                actions.push(Action::ClearSearch);
            }
            ui.separator();

            let label = if self.session.next_toggle_expands() {
                "⊞ Expand"
            } else {
                "⊟ Collapse"
            };
            if ui.button(label).on_hover_text("Collapse or expand the whole graph").clicked() {
                actions.push(Action::ToggleCollapseAll);
            }
            if ui
                .button("⟳ Rotate")
                .on_hover_text(self.session.orientation().next().name())
                .clicked()
            {
                actions.push(Action::RotateLayout);
            }
            if ui.button("⊡ Fit").on_hover_text("Fit to view (F)").clicked() {
                actions.push(Action::FitView);
            }

            let mut show_counts = self.session.config().display.show_counts;
            if ui.checkbox(&mut show_counts, "Counts").changed() {
                actions.push(Action::SetShowCounts(show_counts));
            }
            let theme = self.session.config().display.theme;
            let next = match theme {
                ThemeVariant::Dark => ThemeVariant::Light,
                ThemeVariant::Light => ThemeVariant::Dark,
            };
            if ui.button(if theme == ThemeVariant::Dark { "☀" } else { "☾" }).clicked() {
                actions.push(Action::SetTheme(next));
            }
        });
    }

    fn show_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some(message) = self.session.invalid_message() {
                ui.label(RichText::new(format!("⚠ {}", message)).color(self.session.theme().status_error));
            } else {
                let graph = self.session.graph();
                ui.label(format!("{} nodes · {} edges", graph.len(), graph.edges().len()));
            }
            ui.separator();
            ui.label(self.session.orientation().name());
            ui.label(format!("{:.0}%", self.viewer.zoom * 100.0));
            if let Some(path) = &self.current_path {
                ui.separator();
                ui.label(path.display().to_string());
            }
            if let Some(message) = &self.status_message {
                ui.separator();
                ui.label(message);
            }
        });
    }

    fn show_details(&self, ui: &mut egui::Ui) {
        let Some(id) = self.session.selected() else {
            return;
        };
        let Ok(details) = self.session.details(id) else {
            return;
        };

        ui.add_space(ELEMENT_SPACING);
        ui.horizontal(|ui| {
            ui.label(RichText::new(&details.path).monospace().strong());
            if ui.small_button("📋").on_hover_text("Copy path").clicked() {
                ui.ctx().copy_text(details.path.clone());
            }
            if !details.text.is_empty() && ui.small_button("📄").on_hover_text("Copy values").clicked() {
                ui.ctx().copy_text(details.text.clone());
            }
        });
        if !details.text.is_empty() {
            ui.label(RichText::new(&details.text).monospace());
        }
    }
}

impl eframe::App for DiagramApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(task) = self.session.settle() {
            self.viewer.apply_task(&task, self.session.layout());
        }

        let mut actions = Vec::new();

        let (open, save) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::O),
                i.modifiers.command && i.key_pressed(egui::Key::S),
            )
        });
        if open {
            self.open_dialog();
        }
        if save {
            self.save_dialog();
        }

        egui::TopBottomPanel::top("toolbar")
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(8.0, 6.0)))
            .show(ctx, |ui| {
                self.show_toolbar(ui, &mut actions);
            });

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(12.0, 4.0)))
            .show(ctx, |ui| {
                self.show_status_bar(ui);
            });

        egui::SidePanel::left("editor")
            .default_width(self.editor_width)
            .width_range(240.0..=900.0)
            .resizable(true)
            .show(ctx, |ui| {
                self.editor_width = ui.available_width();
                self.show_details(ui);
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let editor = ui.add(
                        egui::TextEdit::multiline(&mut self.editor_text)
                            .code_editor()
                            .desired_width(f32::INFINITY)
                            .desired_rows(40),
                    );
                    if editor.changed() {
                        actions.push(Action::SetText(self.editor_text.clone()));
                    }
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let orientation = self.session.orientation();
                let viewer_actions = self
                    .viewer
                    .ui(ui, self.session.graph(), self.session.layout(), orientation);
                actions.extend(viewer_actions);
            });

        self.dispatch(ctx, actions);
    }
}
