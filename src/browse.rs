// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Terminal folder browser.
//!
//! This module is the driver around the headless pieces: it maps
//! keyboard/mouse input to [`ViewerEvent`]s, renders the folder tree, the
//! paged image grid, and the fullscreen pane, and wires the debounced
//! visibility recompute into the lazy-load queue and loader pool.
//!
//! The visible set is the current page's slots. A page or folder change
//! triggers a debounced recompute; when it fires, off-page resources are
//! revoked and visible unloaded slots are queued.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    cursor::{Hide, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::queue::{LoadQueue, LoaderPool, QueueEntry, Resource};
use crate::scan::{self, SortKey};
use crate::tree_cache::TreeCache;
use crate::viewer::{Effect, Mode, Viewer, ViewerEvent};

const TREE_WIDTH: u16 = 24;
const CELL_WIDTH: u16 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    Tree,
    Grid,
}

/// Per-image load state, indexed like the enumeration.
#[derive(Default)]
struct Slot {
    resource: Option<Resource>,
    /// Queued or in flight.
    pending: bool,
}

pub struct Browser {
    folder: PathBuf,
    subfolders: Vec<String>,
    tree_selected: usize,
    focus: Focus,
    sort: SortKey,
    viewer: Viewer,
    slots: Vec<Slot>,
    queue: LoadQueue,
    pool: LoaderPool,
    load_threads: usize,
    in_flight: usize,
    tree_cache: TreeCache,
    debouncer: Debouncer,
    grid_area: Rect,
    grid_cols: usize,
    drag_start_x: Option<i32>,
    dirty: bool,
    should_quit: bool,
}

pub fn run(root: PathBuf, config: Config) -> Result<()> {
    let mut browser = Browser::new(root, &config)?;
    init_terminal()?;
    let result = browser.event_loop();
    restore_terminal();
    result
}

impl Browser {
    pub fn new(root: PathBuf, config: &Config) -> Result<Self> {
        Self::with_cache(root, config, TreeCache::new(config.cache_ttl()))
    }

    fn with_cache(root: PathBuf, config: &Config, tree_cache: TreeCache) -> Result<Self> {
        let folder = root.canonicalize()?;
        let mut items = scan::list_folder(&folder)?;
        let sort = SortKey::default();
        scan::sort_refs(&mut items, sort);

        let slots = (0..items.len()).map(|_| Slot::default()).collect();
        let mut browser = Self {
            folder,
            subfolders: Vec::new(),
            tree_selected: 0,
            focus: Focus::Grid,
            sort,
            viewer: Viewer::new(items, config.page_size, config.slideshow_interval()),
            slots,
            queue: LoadQueue::new(config.queue_size),
            pool: LoaderPool::new(config.load_threads),
            load_threads: config.load_threads,
            in_flight: 0,
            tree_cache,
            debouncer: Debouncer::new(config.debounce()),
            grid_area: Rect::default(),
            grid_cols: 1,
            drag_start_x: None,
            dirty: true,
            should_quit: false,
        };
        browser.load_tree();
        browser.recompute_visibility();
        Ok(browser)
    }

    fn event_loop(&mut self) -> Result<()> {
        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;

        loop {
            let now = Instant::now();
            self.poll_loader();
            if self.debouncer.fire(now) {
                self.recompute_visibility();
            }
            let effect = self.viewer.tick(now);
            self.apply_effect(effect, now);

            // Drain all pending input before redrawing.
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key, now),
                    Event::Mouse(mouse) => self.on_mouse(mouse, now),
                    Event::Resize(_, _) => {
                        self.dirty = true;
                        self.schedule_recompute(now);
                    }
                    _ => {}
                }
            }

            if self.should_quit {
                break;
            }
            if self.dirty {
                terminal.draw(|f| self.draw(f))?;
                self.dirty = false;
            }

            // Wait for the next event, loader result, or slideshow tick.
            // Keep the loop tighter while a recompute is pending so it
            // fires close to its deadline.
            let tick = if self.debouncer.pending() {
                Duration::from_millis(8)
            } else {
                Duration::from_millis(16)
            };
            let _ = event::poll(tick);
        }
        Ok(())
    }

    // ── input ───────────────────────────────────────────────────────────

    fn on_key(&mut self, key: KeyEvent, now: Instant) {
        let step: i32 = if key.modifiers.contains(KeyModifiers::CONTROL) {
            10
        } else {
            1
        };

        if key.code == KeyCode::Char('q') {
            let effect = self.viewer.handle_event(ViewerEvent::Quit, now);
            self.apply_effect(effect, now);
            return;
        }

        if self.viewer.mode() == Mode::Fullscreen {
            let event = match key.code {
                KeyCode::Esc => ViewerEvent::Close,
                KeyCode::Right | KeyCode::Down | KeyCode::Char('l') | KeyCode::Char('j') => {
                    ViewerEvent::MoveSelection(step)
                }
                KeyCode::Left | KeyCode::Up | KeyCode::Char('h') | KeyCode::Char('k') => {
                    ViewerEvent::MoveSelection(-step)
                }
                KeyCode::Char(' ') => ViewerEvent::ToggleChecked,
                KeyCode::Char('s') => ViewerEvent::ToggleSlideshow,
                KeyCode::Char('d') => ViewerEvent::DeleteCurrent,
                _ => return,
            };
            let effect = self.viewer.handle_event(event, now);
            self.apply_effect(effect, now);
            return;
        }

        match self.focus {
            Focus::Tree => match key.code {
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.tree_selected + 1 < self.subfolders.len() {
                        self.tree_selected += 1;
                        self.dirty = true;
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    if self.tree_selected > 0 {
                        self.tree_selected -= 1;
                        self.dirty = true;
                    }
                }
                KeyCode::Enter => self.descend(),
                KeyCode::Backspace => self.ascend(),
                KeyCode::Tab => {
                    self.focus = Focus::Grid;
                    self.dirty = true;
                }
                _ => {}
            },
            Focus::Grid => {
                let event = match key.code {
                    KeyCode::Right | KeyCode::Char('l') | KeyCode::Down | KeyCode::Char('j') => {
                        Some(ViewerEvent::MoveSelection(step))
                    }
                    KeyCode::Left | KeyCode::Char('h') | KeyCode::Up | KeyCode::Char('k') => {
                        Some(ViewerEvent::MoveSelection(-step))
                    }
                    KeyCode::PageDown | KeyCode::Char('n') => Some(ViewerEvent::PageBy(1)),
                    KeyCode::PageUp | KeyCode::Char('p') => Some(ViewerEvent::PageBy(-1)),
                    KeyCode::Enter => Some(ViewerEvent::Open),
                    KeyCode::Char(' ') => Some(ViewerEvent::ToggleChecked),
                    KeyCode::Char('+') => {
                        Some(ViewerEvent::SetPageSize(self.viewer.page_size() + 1))
                    }
                    KeyCode::Char('-') => Some(ViewerEvent::SetPageSize(
                        self.viewer.page_size().saturating_sub(1),
                    )),
                    _ => None,
                };
                if let Some(event) = event {
                    let effect = self.viewer.handle_event(event, now);
                    self.apply_effect(effect, now);
                    return;
                }
                match key.code {
                    KeyCode::Tab => {
                        self.focus = Focus::Tree;
                        self.dirty = true;
                    }
                    KeyCode::Backspace => self.ascend(),
                    KeyCode::Char('o') => self.cycle_sort(),
                    KeyCode::Char('r') => self.refresh(),
                    _ => {}
                }
            }
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_start_x = Some(i32::from(mouse.column));
                if self.viewer.mode() == Mode::Browsing
                    && let Some(index) = grid_hit(
                        self.grid_area,
                        self.grid_cols,
                        self.viewer.page_items().len(),
                        mouse.column,
                        mouse.row,
                    )
                {
                    let delta = index as i32 - self.viewer.selected() as i32;
                    let effect = self.viewer.handle_event(ViewerEvent::MoveSelection(delta), now);
                    self.apply_effect(effect, now);
                    self.focus = Focus::Grid;
                    self.dirty = true;
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(start_x) = self.drag_start_x.take() {
                    let end_x = i32::from(mouse.column);
                    if end_x != start_x {
                        let effect = self
                            .viewer
                            .handle_event(ViewerEvent::Swipe { start_x, end_x }, now);
                        self.apply_effect(effect, now);
                    }
                }
            }
            MouseEventKind::ScrollDown => {
                let effect = self.viewer.handle_event(ViewerEvent::PageBy(1), now);
                self.apply_effect(effect, now);
            }
            MouseEventKind::ScrollUp => {
                let effect = self.viewer.handle_event(ViewerEvent::PageBy(-1), now);
                self.apply_effect(effect, now);
            }
            _ => {}
        }
    }

    fn apply_effect(&mut self, effect: Effect, now: Instant) {
        match effect {
            Effect::None => {}
            Effect::Redraw => self.dirty = true,
            Effect::PageChanged => {
                self.dirty = true;
                if self.slots.len() != self.viewer.items().len() {
                    // The collection itself changed (a delete): the slot
                    // numbering is stale, not just the visible window.
                    self.rebuild_slots();
                } else {
                    self.schedule_recompute(now);
                }
            }
            Effect::Quit => self.should_quit = true,
        }
    }

    // ── folders ─────────────────────────────────────────────────────────

    fn descend(&mut self) {
        let Some(name) = self.subfolders.get(self.tree_selected) else {
            return;
        };
        self.enter_folder(self.folder.join(name));
    }

    fn ascend(&mut self) {
        let Some(parent) = self.folder.parent().map(Path::to_path_buf) else {
            return;
        };
        self.enter_folder(parent);
    }

    fn enter_folder(&mut self, path: PathBuf) {
        match scan::list_folder(&path) {
            Ok(mut items) => {
                scan::sort_refs(&mut items, self.sort);
                self.folder = path;
                self.viewer.set_items(items);
                self.load_tree();
                self.rebuild_slots();
                self.dirty = true;
            }
            Err(err) => eprintln!("sig: cannot open folder: {err}"),
        }
    }

    fn load_tree(&mut self) {
        self.subfolders = self.tree_cache.read(&self.folder).unwrap_or_else(|| {
            let folders = scan::subfolders(&self.folder).unwrap_or_else(|err| {
                eprintln!("sig: folder listing failed: {err}");
                Vec::new()
            });
            if let Err(err) = self.tree_cache.write(&self.folder, &folders) {
                eprintln!("sig: tree cache write failed: {err}");
            }
            folders
        });
        self.tree_selected = 0;
    }

    /// Re-read the current folder from disk, bypassing the tree cache.
    fn refresh(&mut self) {
        let folders = scan::subfolders(&self.folder).unwrap_or_default();
        if let Err(err) = self.tree_cache.write(&self.folder, &folders) {
            eprintln!("sig: tree cache write failed: {err}");
        }
        self.subfolders = folders;
        self.tree_selected = 0;
        match scan::list_folder(&self.folder) {
            Ok(mut items) => {
                scan::sort_refs(&mut items, self.sort);
                self.viewer.set_items(items);
                self.rebuild_slots();
            }
            Err(err) => eprintln!("sig: rescan failed: {err}"),
        }
        self.dirty = true;
    }

    fn cycle_sort(&mut self) {
        self.sort = self.sort.cycle();
        let mut items = self.viewer.items().to_vec();
        scan::sort_refs(&mut items, self.sort);
        self.viewer.set_items(items);
        self.rebuild_slots();
        self.dirty = true;
    }

    // ── loading ─────────────────────────────────────────────────────────

    /// The enumeration indices shown on the current page.
    fn visible_slots(&self) -> Vec<usize> {
        let start = (self.viewer.current_page() - 1) * self.viewer.page_size();
        let len = self.viewer.page_items().len();
        (start..start + len).collect()
    }

    /// Drop pending requests and restart the quiet-period timer; the
    /// recompute itself runs when the debouncer fires.
    fn schedule_recompute(&mut self, now: Instant) {
        for entry in self.queue.drain() {
            if let Some(slot) = self.slots.get_mut(entry.slot) {
                slot.pending = false;
            }
        }
        self.debouncer.trigger(now);
    }

    fn recompute_visibility(&mut self) {
        let visible = self.visible_slots();
        let visible_set: HashSet<usize> = visible.iter().copied().collect();

        // Revoke resources that scrolled out of view. In-flight loads are
        // left alone; their results land and the next pass revokes them.
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !visible_set.contains(&i) && slot.resource.is_some() {
                slot.resource = None;
            }
        }

        for &i in &visible {
            let wanted = self
                .slots
                .get(i)
                .map(|slot| slot.resource.is_none() && !slot.pending && !self.queue.contains(i))
                .unwrap_or(false);
            if !wanted {
                continue;
            }
            let path = self.viewer.items()[i].path.clone();
            if let Some(evicted) = self.queue.enqueue(QueueEntry { slot: i, path }) {
                if let Some(old) = self.slots.get_mut(evicted.slot) {
                    old.pending = false;
                }
            }
            self.slots[i].pending = true;
        }

        self.pump();
        self.dirty = true;
    }

    /// Keep loads saturated up to the concurrency limit.
    fn pump(&mut self) {
        while self.in_flight < self.load_threads {
            let Some(entry) = self.queue.pop() else {
                break;
            };
            self.pool.submit(entry.slot, entry.path);
            self.in_flight += 1;
        }
    }

    fn poll_loader(&mut self) {
        while let Some(result) = self.pool.try_recv() {
            if result.epoch != self.pool.current_epoch() {
                // From before a folder change; the slot numbering is gone.
                continue;
            }
            self.in_flight = self.in_flight.saturating_sub(1);
            if let Some(slot) = self.slots.get_mut(result.slot) {
                slot.pending = false;
                if let Some(bytes) = result.bytes {
                    // May land for a slot that already left the page; the
                    // next recompute revokes it.
                    slot.resource = Some(Resource {
                        path: result.path,
                        bytes,
                    });
                }
            }
            self.pump();
            self.dirty = true;
        }
    }

    fn rebuild_slots(&mut self) {
        self.pool.bump_epoch();
        self.in_flight = 0;
        self.queue.drain();
        self.slots = (0..self.viewer.items().len())
            .map(|_| Slot::default())
            .collect();
        self.recompute_visibility();
    }

    // ── rendering ───────────────────────────────────────────────────────

    fn draw(&mut self, f: &mut Frame) {
        let columns =
            Layout::horizontal([Constraint::Length(TREE_WIDTH), Constraint::Min(1)]).split(f.area());
        self.draw_tree(f, columns[0]);
        match self.viewer.mode() {
            Mode::Browsing => {
                let rows =
                    Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(columns[1]);
                self.draw_grid(f, rows[0]);
                self.draw_status(f, rows[1]);
            }
            Mode::Fullscreen => self.draw_fullscreen(f, columns[1]),
        }
    }

    fn draw_tree(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .subfolders
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let style = if i == self.tree_selected && self.focus == Focus::Tree {
                    Style::new().add_modifier(Modifier::REVERSED)
                } else {
                    Style::new()
                };
                ListItem::new(Line::from(Span::styled(name.clone(), style)))
            })
            .collect();
        let title = self
            .folder
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("/")
            .to_string();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(list, area);
    }

    fn draw_grid(&mut self, f: &mut Frame, area: Rect) {
        self.grid_area = area;
        self.grid_cols = grid_cols(area.width);
        let cols = self.grid_cols;
        let cell_w = CELL_WIDTH as usize;
        let page_start = (self.viewer.current_page() - 1) * self.viewer.page_size();

        let mut lines: Vec<Line> = Vec::new();
        let page_items = self.viewer.page_items();
        for (row_idx, chunk) in page_items.chunks(cols).enumerate() {
            let mut spans: Vec<Span> = Vec::new();
            for (col_idx, item) in chunk.iter().enumerate() {
                let i = row_idx * cols + col_idx;
                let global = page_start + i;
                let loaded = self
                    .slots
                    .get(global)
                    .map(|slot| slot.resource.is_some())
                    .unwrap_or(false);
                let mark = if self.viewer.is_checked(item) { '*' } else { ' ' };
                let text: String = format!("{mark}{}", item.name())
                    .chars()
                    .take(cell_w - 1)
                    .collect();
                let mut style = Style::new();
                if !loaded {
                    style = style.add_modifier(Modifier::DIM);
                }
                if i == self.viewer.selected() && self.focus == Focus::Grid {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                spans.push(Span::styled(format!("{text:<cell_w$}"), style));
            }
            lines.push(Line::from(spans));
        }
        if lines.is_empty() {
            lines.push(Line::from("no images in this folder"));
        }
        f.render_widget(Paragraph::new(lines), area);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let mut status = self.viewer.status_text();
        status.push_str(&format!("  sort: {}", self.sort.label()));
        let loading = self.slots.iter().filter(|slot| slot.pending).count();
        if loading > 0 {
            status.push_str(&format!("  loading {loading}"));
        }
        if !self.queue.is_empty() {
            status.push_str(&format!("  queued {}", self.queue.len()));
        }
        f.render_widget(Paragraph::new(status), area);
    }

    fn draw_fullscreen(&self, f: &mut Frame, area: Rect) {
        let Some(g) = self.viewer.global_index() else {
            return;
        };
        let current = &self.viewer.items()[g];
        let resource = self
            .slots
            .get(g)
            .and_then(|slot| slot.resource.as_ref())
            .filter(|resource| resource.path == current.path);

        let mut lines = vec![
            Line::from(current.name()),
            Line::from(current.path.display().to_string()),
        ];
        match resource {
            Some(resource) => {
                if let Some((w, h)) = image_dimensions(&resource.bytes) {
                    lines.push(Line::from(format!("{w} x {h}")));
                }
                lines.push(Line::from(format!("{} bytes", resource.bytes.len())));
            }
            None => lines.push(Line::from("loading...")),
        }
        if let Some(modified) = current.modified {
            lines.push(Line::from(format_timestamp(modified)));
        }
        if self.viewer.is_checked(current) {
            lines.push(Line::from("checked"));
        }
        if self.viewer.slideshow_running() {
            lines.push(Line::from("slideshow"));
        }

        let title = format!("[{}/{}]", g + 1, self.viewer.items().len());
        let pane = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(pane, area);
    }
}

fn grid_cols(width: u16) -> usize {
    (width / CELL_WIDTH).max(1) as usize
}

fn grid_hit(area: Rect, cols: usize, len: usize, column: u16, row: u16) -> Option<usize> {
    if column < area.x
        || row < area.y
        || column >= area.x + area.width
        || row >= area.y + area.height
    {
        return None;
    }
    let col = ((column - area.x) / CELL_WIDTH) as usize;
    if col >= cols {
        return None;
    }
    let index = (row - area.y) as usize * cols + col;
    (index < len).then_some(index)
}

fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Render a modification time as `YYYY-MM-DD HH:MM` (UTC).
fn format_timestamp(t: SystemTime) -> String {
    let secs = t
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = secs / 86_400;
    let time = secs % 86_400;
    let (hour, minute) = (time / 3_600, (time % 3_600) / 60);

    let mut year = 1970u64;
    let mut remaining = days;
    loop {
        let year_len = if is_leap(year) { 366 } else { 365 };
        if remaining < year_len {
            break;
        }
        remaining -= year_len;
        year += 1;
    }
    let months = [
        31,
        if is_leap(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut month = 1;
    for month_len in months {
        if remaining < month_len {
            break;
        }
        remaining -= month_len;
        month += 1;
    }
    format!(
        "{year:04}-{month:02}-{:02} {hour:02}:{minute:02}",
        remaining + 1
    )
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn init_terminal() -> std::io::Result<()> {
    use std::io::stdout;

    enable_raw_mode()?;
    execute!(
        stdout(),
        EnterAlternateScreen,
        EnableMouseCapture,
        Clear(ClearType::All),
        Hide
    )?;
    Ok(())
}

fn restore_terminal() {
    use std::io::stdout;

    let _ = disable_raw_mode();
    let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, Show);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            page_size: 4,
            queue_size: 3,
            load_threads: 2,
            ..Config::default()
        }
    }

    fn gallery_dir(count: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..count {
            std::fs::write(dir.path().join(format!("img{i:02}.png")), b"bytes").unwrap();
        }
        dir
    }

    /// Browser with its cache slot isolated inside the gallery tempdir, so
    /// parallel tests never share the platform cache file.
    fn test_browser(dir: &tempfile::TempDir, config: &Config) -> Browser {
        let cache = TreeCache::with_file(
            dir.path().join(".test_tree_cache.json"),
            config.cache_ttl(),
        );
        Browser::with_cache(dir.path().to_path_buf(), config, cache).unwrap()
    }

    fn drain_results(browser: &mut Browser) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while browser.in_flight > 0 && Instant::now() < deadline {
            browser.poll_loader();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_new_enqueues_only_the_first_page() {
        let dir = gallery_dir(10);
        let mut browser = test_browser(&dir, &test_config());
        assert_eq!(browser.slots.len(), 10);

        // Page size 4, queue capacity 3, 2 in flight: every request fits in
        // the machinery, nothing beyond the first page is touched.
        let pending: Vec<usize> = (0..browser.slots.len())
            .filter(|&i| browser.slots[i].pending)
            .collect();
        assert!(pending.iter().all(|&i| i < 4), "pending: {pending:?}");

        drain_results(&mut browser);
        assert!(browser.slots[..4].iter().filter(|s| s.resource.is_some()).count() > 0);
        assert!(browser.slots[4..].iter().all(|s| s.resource.is_none()));
    }

    #[test]
    fn test_page_change_revokes_old_page() {
        let dir = gallery_dir(8);
        let mut browser = test_browser(&dir, &test_config());
        drain_results(&mut browser);
        // A second pass picks up the request the first burst evicted.
        browser.recompute_visibility();
        drain_results(&mut browser);
        assert!(browser.slots[..4].iter().all(|s| s.resource.is_some()));

        let now = Instant::now();
        let effect = browser.viewer.handle_event(ViewerEvent::PageBy(1), now);
        browser.apply_effect(effect, now);
        assert!(browser.debouncer.pending());
        assert!(browser.debouncer.fire(now + Duration::from_millis(100)));
        browser.recompute_visibility();

        // The old page's bytes are revoked.
        assert!(browser.slots[..4].iter().all(|s| s.resource.is_none()));
        // Queue capacity 3 over 4 new slots: the oldest request (slot 4)
        // was evicted, the fresher three are queued or in flight.
        assert!(!browser.slots[4].pending);
        assert!(browser.slots[5..8].iter().all(|s| s.pending));
    }

    #[test]
    fn test_enter_folder_resets_slots_and_viewer() {
        let dir = gallery_dir(6);
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("one.png"), b"x").unwrap();

        let mut browser = test_browser(&dir, &test_config());
        let old_epoch = browser.pool.current_epoch();
        browser.enter_folder(sub);

        assert_eq!(browser.folder.file_name().unwrap(), "sub");
        assert_eq!(browser.slots.len(), 1);
        assert_eq!(browser.viewer.current_page(), 1);
        assert!(browser.pool.current_epoch() > old_epoch);
        assert_eq!(browser.in_flight, 1);
    }

    #[test]
    fn test_delete_rebuilds_slots() {
        let dir = gallery_dir(5);
        let mut browser = test_browser(&dir, &test_config());
        let now = Instant::now();

        let effect = browser.viewer.handle_event(ViewerEvent::Open, now);
        browser.apply_effect(effect, now);
        let effect = browser.viewer.handle_event(ViewerEvent::DeleteCurrent, now);
        browser.apply_effect(effect, now);

        assert_eq!(browser.viewer.items().len(), 4);
        assert_eq!(browser.slots.len(), 4);
    }

    #[test]
    fn test_load_tree_uses_cache_slot() {
        let dir = gallery_dir(1);
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::create_dir(dir.path().join("beta")).unwrap();

        let mut browser = test_browser(&dir, &test_config());
        assert_eq!(browser.subfolders, vec!["alpha", "beta"]);

        // A later listing comes from the cache even if the disk changed.
        std::fs::create_dir(dir.path().join("gamma")).unwrap();
        browser.load_tree();
        assert_eq!(browser.subfolders, vec!["alpha", "beta"]);

        // A forced refresh bypasses it.
        browser.refresh();
        assert_eq!(browser.subfolders, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_grid_cols() {
        assert_eq!(grid_cols(0), 1);
        assert_eq!(grid_cols(23), 1);
        assert_eq!(grid_cols(48), 2);
        assert_eq!(grid_cols(100), 4);
    }

    #[test]
    fn test_grid_hit() {
        let area = Rect::new(24, 0, 72, 10);
        // Three columns of width 24.
        assert_eq!(grid_hit(area, 3, 9, 24, 0), Some(0));
        assert_eq!(grid_hit(area, 3, 9, 50, 0), Some(1));
        assert_eq!(grid_hit(area, 3, 9, 30, 2), Some(6));
        // Outside the area.
        assert_eq!(grid_hit(area, 3, 9, 10, 0), None);
        // Past the last item.
        assert_eq!(grid_hit(area, 3, 9, 24, 3), None);
    }

    #[test]
    fn test_format_timestamp() {
        let t = UNIX_EPOCH + Duration::from_secs(1_704_067_200);
        assert_eq!(format_timestamp(t), "2024-01-01 00:00");
        let t = UNIX_EPOCH + Duration::from_secs(45_045);
        assert_eq!(format_timestamp(t), "1970-01-01 12:30");
    }

    #[test]
    fn test_is_leap() {
        assert!(is_leap(2000));
        assert!(is_leap(2024));
        assert!(!is_leap(1900));
        assert!(!is_leap(2023));
    }
}
