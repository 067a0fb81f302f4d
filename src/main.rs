use clap::Parser;
use dirtree::render_tree::{visible_rows, RenderRow};
use dirtree::{Config, InputTarget, TreeController};
use eframe::egui;
use indextree::NodeId;
use std::path::PathBuf;

const NEW_ENTRY_NAME: &str = "new item";
const BUTTON_WIDTH: f32 = 22.0;
const MARKER_WIDTH: f32 = 18.0;

#[derive(Parser, Debug)]
#[command(name = "dirtree", about = "Collapsible directory tree")]
struct Args {
    /// JSON config file
    #[arg(long, default_value = "dirtree.json")]
    config: PathBuf,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Whitespace-separated paths to build at startup
    #[arg(long)]
    paths: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    dirtree::logging::init(args.log_file.as_deref())?;

    let config = Config::load_or_default(&args.config)?;
    let mut controller = TreeController::initialize(&config);
    if let Some(paths) = args.paths.as_deref() {
        controller.build_from_path_batch(paths);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 800.0])
            .with_title("dirtree"),
        ..Default::default()
    };

    eframe::run_native(
        "dirtree",
        options,
        Box::new(move |_cc| Box::new(DirTreeApp::new(controller))),
    )?;
    Ok(())
}

/// Deferred change requested while drawing rows.
enum RowAction {
    Select(NodeId),
    Toggle(NodeId),
    Add(NodeId),
    Delete(NodeId),
    Edit(NodeId),
    CommitEdit,
    CancelEdit,
}

struct DirTreeApp {
    controller: TreeController,
    selected: Option<NodeId>,
    editing: Option<NodeId>,
    edit_buffer: String,
    focus_edit: bool,
    batch_input: String,
    status: String,
}

impl DirTreeApp {
    fn new(controller: TreeController) -> Self {
        let selected = Some(controller.root());
        Self {
            controller,
            selected,
            editing: None,
            edit_buffer: String::new(),
            focus_edit: false,
            batch_input: String::new(),
            status: String::from("Ready"),
        }
    }

    fn begin_edit(&mut self, id: NodeId) {
        self.edit_buffer = self
            .controller
            .tree()
            .node(id)
            .map(|node| node.display_name().to_string())
            .unwrap_or_default();
        self.editing = Some(id);
        self.focus_edit = true;
    }

    fn apply(&mut self, action: RowAction) {
        match action {
            RowAction::Select(id) => self.selected = Some(id),
            RowAction::Toggle(id) => {
                self.selected = Some(id);
                self.controller.tree_mut().toggle_open(id);
            }
            RowAction::Add(id) => match self.controller.tree_mut().add_child(id, NEW_ENTRY_NAME) {
                Some(child) => {
                    self.selected = Some(child);
                    self.begin_edit(child);
                }
                None => self.status = String::from("Only folders can hold entries"),
            },
            RowAction::Delete(id) => {
                let parent = self.controller.tree().parent(id);
                self.controller.tree_mut().mark_for_deletion(id);
                self.selected = parent;
                self.status = String::from("Deleted");
            }
            RowAction::Edit(id) => self.begin_edit(id),
            RowAction::CommitEdit => {
                if let Some(id) = self.editing.take() {
                    let name = std::mem::take(&mut self.edit_buffer);
                    self.status = if self.controller.commit_input(InputTarget::Rename(id), &name) {
                        format!("Renamed to {}", name.trim())
                    } else {
                        String::from("Rename rejected: a folder with children must keep a trailing /")
                    };
                }
            }
            RowAction::CancelEdit => {
                self.editing = None;
                self.edit_buffer.clear();
            }
        }
    }

    fn commit_batch(&mut self) {
        let text = std::mem::take(&mut self.batch_input);
        if text.trim().is_empty() {
            return;
        }
        self.controller.commit_input(InputTarget::PathBatch, &text);
        self.status = format!("Added {} path(s)", text.split_whitespace().count());
    }

    /// Draw one row and report what the user asked for, if anything.
    fn draw_row(&mut self, ui: &mut egui::Ui, origin: egui::Pos2, width: f32, row: &RenderRow) -> Option<RowAction> {
        let row_rect = egui::Rect::from_min_size(
            origin + egui::vec2(row.x, row.y),
            egui::vec2((width - row.x).max(MARKER_WIDTH * 2.0), row.height),
        );
        let is_selected = self.selected == Some(row.id);
        let response = ui.interact(row_rect, egui::Id::new(("row", row.id)), egui::Sense::click());

        let painter = ui.painter();
        if is_selected {
            painter.rect_filled(row_rect, 4.0, egui::Color32::from_rgb(55, 65, 90));
        } else if response.hovered() {
            painter.rect_filled(row_rect, 4.0, egui::Color32::from_rgba_unmultiplied(255, 255, 255, 12));
        }

        let mut action = None;
        if response.clicked() {
            action = Some(RowAction::Select(row.id));
        }
        if response.double_clicked() && row.can_toggle {
            action = Some(RowAction::Toggle(row.id));
        }

        let marker_rect = egui::Rect::from_min_size(row_rect.min, egui::vec2(MARKER_WIDTH, row.height));
        if row.can_toggle {
            let marker = if row.is_open { "▾" } else { "▸" };
            if ui.put(marker_rect, egui::Button::new(marker).frame(false)).clicked() {
                action = Some(RowAction::Toggle(row.id));
            }
        }

        let buttons_width = if is_selected { BUTTON_WIDTH * 3.0 } else { 0.0 };
        let label_rect = egui::Rect::from_min_max(
            egui::pos2(marker_rect.max.x, row_rect.min.y),
            egui::pos2((row_rect.max.x - buttons_width).max(marker_rect.max.x + 1.0), row_rect.max.y),
        );

        if self.editing == Some(row.id) {
            let edit = ui.put(label_rect, egui::TextEdit::singleline(&mut self.edit_buffer));
            if self.focus_edit {
                edit.request_focus();
                self.focus_edit = false;
            }
            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                action = Some(RowAction::CancelEdit);
            } else if edit.lost_focus() {
                action = Some(RowAction::CommitEdit);
            }
        } else {
            let color = if row.is_dir {
                egui::Color32::from_rgb(130, 180, 240)
            } else {
                egui::Color32::from_rgb(224, 224, 224)
            };
            ui.painter().text(
                egui::pos2(label_rect.min.x + 2.0, label_rect.center().y),
                egui::Align2::LEFT_CENTER,
                &row.name,
                egui::FontId::proportional(14.0),
                color,
            );
        }

        if is_selected {
            let mut slot = egui::Rect::from_min_size(
                egui::pos2(row_rect.max.x - buttons_width, row_rect.min.y),
                egui::vec2(BUTTON_WIDTH, row.height),
            );
            if row.is_dir && ui.put(slot, egui::Button::new("+").small()).clicked() {
                action = Some(RowAction::Add(row.id));
            }
            slot = slot.translate(egui::vec2(BUTTON_WIDTH, 0.0));
            if ui.put(slot, egui::Button::new("e").small()).clicked() {
                action = Some(RowAction::Edit(row.id));
            }
            slot = slot.translate(egui::vec2(BUTTON_WIDTH, 0.0));
            if row.depth > 0 && ui.put(slot, egui::Button::new("-").small()).clicked() {
                action = Some(RowAction::Delete(row.id));
            }
        }

        action
    }
}

impl eframe::App for DirTreeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("dirtree");
                ui.separator();

                ui.label("Paths:");
                let response = ui.text_edit_singleline(&mut self.batch_input);
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Add").clicked() || submitted {
                    self.commit_batch();
                }
            });
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.separator();
                ui.label(format!("Layout passes: {}", self.controller.layout_passes()));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let rows = visible_rows(self.controller.tree());
                    let width = ui.available_width();
                    let height = self.controller.total_height();
                    let (area, _) = ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::hover());

                    let mut pending = None;
                    for row in &rows {
                        if let Some(action) = self.draw_row(ui, area.min, width, row) {
                            pending = Some(action);
                        }
                    }
                    if let Some(action) = pending {
                        self.apply(action);
                        ctx.request_repaint();
                    }
                });
        });
    }
}
