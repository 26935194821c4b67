use crate::canvas::Canvas;
use crate::error::AppError;
use crate::hotkey::{Hotkey, ModifierState};
use crate::keyboard_hook::{HookSystem, KeyEvent, KeyListener, KeyboardHook};
use crate::render::{Palette, ShapeRenderer};
use crate::settings::Settings;
use crate::window::{WindowController, WindowHandle, WindowListener, WindowSpec, WindowSystem};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Which of the two configured colors is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Inactive,
    Active,
}

impl ColorMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Inactive => Self::Active,
            Self::Active => Self::Inactive,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Owns the overlay's mode and sequences the window and hook lifecycles.
///
/// Everything runs on the thread that owns the message loop: window messages
/// and hook notifications arrive as nested callbacks inside it, so the mode
/// is a plain [`Cell`]. Callbacks reach the app through weak listener
/// references, which is why the lifecycle methods take `self: &Rc<Self>`.
pub struct App {
    settings: Settings,
    hotkey: Hotkey,
    mode: Cell<ColorMode>,
    renderer: ShapeRenderer,
    window: WindowController,
    hook: KeyboardHook,
    modifiers: Box<dyn ModifierState>,
}

impl App {
    pub fn new(
        settings: Settings,
        window_system: Box<dyn WindowSystem>,
        hook_system: Box<dyn HookSystem>,
        modifiers: Box<dyn ModifierState>,
    ) -> Self {
        let renderer = ShapeRenderer::new(
            Palette {
                active: settings.active_color,
                inactive: settings.inactive_color,
            },
            settings.border_width,
            settings.border_color,
        );
        Self {
            hotkey: settings.hotkey(),
            settings,
            mode: Cell::new(ColorMode::Inactive),
            renderer,
            window: WindowController::new(window_system),
            hook: KeyboardHook::new(hook_system),
            modifiers,
        }
    }

    /// App wired to the Win32 window, hook and key-state query.
    #[cfg(windows)]
    pub fn native(settings: Settings) -> Self {
        Self::new(
            settings,
            Box::new(crate::window::Win32Window),
            Box::new(crate::keyboard_hook::Win32KeyboardHook),
            Box::new(crate::hotkey::AsyncKeyState),
        )
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn hotkey(&self) -> Hotkey {
        self.hotkey
    }

    pub fn mode(&self) -> ColorMode {
        self.mode.get()
    }

    pub fn is_active(&self) -> bool {
        self.mode.get().is_active()
    }

    pub fn window_handle(&self) -> Option<WindowHandle> {
        self.window.handle()
    }

    pub fn hook_installed(&self) -> bool {
        self.hook.is_installed()
    }

    /// Create, shape and show the window, then install the hook. The window
    /// always exists before the hook is requested.
    pub fn start(self: &Rc<Self>) -> Result<(), AppError> {
        let spec = WindowSpec::from_settings(&self.settings);
        let window_listener: Weak<dyn WindowListener> = Rc::<Self>::downgrade(self);
        self.window.create(&spec, window_listener)?;

        if let Err(err) = self.window.apply_round_shape(spec.width, spec.height) {
            tracing::warn!(%err, "keeping rectangular window");
        }
        self.window.show();

        let key_listener: Weak<dyn KeyListener> = Rc::<Self>::downgrade(self);
        self.hook.install(key_listener)?;

        tracing::info!(hotkey = %self.hotkey, "overlay running");
        Ok(())
    }

    /// Start, pump messages until quit, then release whatever is still held.
    /// Returns the exit code carried by the quit message.
    pub fn run(self: &Rc<Self>) -> Result<i32, AppError> {
        if let Err(err) = self.start() {
            self.shutdown();
            return Err(err);
        }

        let exit_code = self.window.run_message_loop();
        self.shutdown();
        tracing::info!(exit_code, "message loop finished");
        Ok(exit_code)
    }

    /// Remove the hook, then destroy the window if it still exists. Safe to
    /// call any number of times.
    pub fn shutdown(&self) {
        self.hook.uninstall();
        self.window.destroy();
    }

    /// Flip the mode and request a repaint. The paint itself happens when the
    /// OS delivers the paint message.
    pub fn toggle(&self) {
        let next = self.mode.get().toggled();
        self.mode.set(next);
        tracing::debug!(mode = ?next, "mode toggled");
        self.window.invalidate();
    }

    /// Handle one key-down from the global hook. Returns whether it toggled.
    pub fn on_key_pressed(&self, event: &KeyEvent) -> bool {
        if !self.hotkey.matches(event, self.modifiers.as_ref()) {
            return false;
        }
        self.toggle();
        true
    }

    pub fn on_paint(&self, canvas: &mut dyn Canvas, width: i32, height: i32) {
        self.renderer
            .render(canvas, width, height, || self.mode.get().is_active());
    }

    /// The window is going away: drop the hook first, then end the loop.
    pub fn on_destroy(&self) {
        self.hook.uninstall();
        self.window.mark_destroyed();
        self.window.post_quit(0);
    }
}

impl WindowListener for App {
    fn paint(&self, canvas: &mut dyn Canvas, width: i32, height: i32) {
        self.on_paint(canvas, width, height);
    }

    fn destroyed(&self) {
        self.on_destroy();
    }
}

impl KeyListener for App {
    fn key_down(&self, event: &KeyEvent) {
        self.on_key_pressed(event);
    }
}
