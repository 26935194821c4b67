use crate::canvas::Canvas;
use crate::error::AppError;
use crate::settings::Settings;
use std::cell::Cell;
use std::rc::Weak;

/// Opaque identifier of the overlay's native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Geometry and title of the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowSpec {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            title: settings.window_title.clone(),
            x: settings.x,
            y: settings.y,
            width: settings.width,
            height: settings.height,
        }
    }
}

/// Receives the window notifications that need application state.
pub trait WindowListener {
    fn paint(&self, canvas: &mut dyn Canvas, width: i32, height: i32);
    fn destroyed(&self);
}

/// Native window primitives. Every call happens on the thread that created
/// the window.
pub trait WindowSystem {
    /// Register the window class (once per process) and create a borderless,
    /// topmost tool-window popup. `listener` is retained by the window until
    /// it is finally destroyed.
    fn create_window(
        &self,
        spec: &WindowSpec,
        listener: Weak<dyn WindowListener>,
    ) -> Result<WindowHandle, AppError>;
    /// Clip the window to the ellipse inscribed in `width` x `height`.
    fn set_round_region(&self, window: WindowHandle, width: i32, height: i32)
        -> Result<(), AppError>;
    fn show(&self, window: WindowHandle);
    /// Schedule a repaint of the whole client area without painting now.
    fn invalidate(&self, window: WindowHandle);
    fn destroy(&self, window: WindowHandle);
    fn post_quit(&self, exit_code: i32);
    /// Block retrieving and dispatching messages until the quit message
    /// arrives, then return its exit code.
    fn run_message_loop(&self) -> i32;
}

/// Window messages the overlay reacts to. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Paint,
    PrimaryButtonDown,
    Destroy,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    /// Fall back to the OS default handling.
    Default,
}

pub trait WindowEventHandler {
    /// Open a paint scope, render, close the scope.
    fn paint(&mut self);
    /// Release pointer capture and start a caption drag.
    fn begin_drag(&mut self);
    fn destroyed(&mut self);
}

pub fn dispatch_window_event(
    event: WindowEvent,
    handler: &mut dyn WindowEventHandler,
) -> Disposition {
    match event {
        WindowEvent::Paint => {
            handler.paint();
            Disposition::Handled
        }
        WindowEvent::PrimaryButtonDown => {
            handler.begin_drag();
            Disposition::Handled
        }
        WindowEvent::Destroy => {
            handler.destroyed();
            Disposition::Handled
        }
        WindowEvent::Other => Disposition::Default,
    }
}

/// Owns the single window handle.
pub struct WindowController {
    system: Box<dyn WindowSystem>,
    handle: Cell<Option<WindowHandle>>,
}

impl WindowController {
    pub fn new(system: Box<dyn WindowSystem>) -> Self {
        Self {
            system,
            handle: Cell::new(None),
        }
    }

    pub fn create(
        &self,
        spec: &WindowSpec,
        listener: Weak<dyn WindowListener>,
    ) -> Result<WindowHandle, AppError> {
        if let Some(handle) = self.handle.get() {
            tracing::warn!(?handle, "overlay window already exists");
            return Ok(handle);
        }

        let handle = self.system.create_window(spec, listener)?;
        tracing::debug!(?handle, ?spec, "overlay window created");
        self.handle.set(Some(handle));
        Ok(handle)
    }

    pub fn apply_round_shape(&self, width: i32, height: i32) -> Result<(), AppError> {
        let handle = self
            .handle
            .get()
            .ok_or_else(|| AppError::ShapeRegion("window does not exist".into()))?;
        self.system.set_round_region(handle, width, height)
    }

    pub fn show(&self) {
        if let Some(handle) = self.handle.get() {
            self.system.show(handle);
        }
    }

    pub fn invalidate(&self) {
        if let Some(handle) = self.handle.get() {
            self.system.invalidate(handle);
        }
    }

    /// Destroy the window if it still exists. Returns whether a native
    /// destroy was issued.
    pub fn destroy(&self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                self.system.destroy(handle);
                true
            }
            None => false,
        }
    }

    /// Forget the handle after the OS reported the window destroyed.
    pub fn mark_destroyed(&self) {
        self.handle.set(None);
    }

    pub fn post_quit(&self, exit_code: i32) {
        self.system.post_quit(exit_code);
    }

    pub fn run_message_loop(&self) -> i32 {
        self.system.run_message_loop()
    }

    pub fn handle(&self) -> Option<WindowHandle> {
        self.handle.get()
    }
}

#[cfg(windows)]
pub use platform::Win32Window;

#[cfg(windows)]
mod platform {
    use super::{
        dispatch_window_event, Disposition, WindowEvent, WindowEventHandler, WindowHandle,
        WindowListener, WindowSpec, WindowSystem,
    };
    use crate::canvas::GdiCanvas;
    use crate::error::AppError;
    use once_cell::sync::OnceCell;
    use std::rc::{Rc, Weak};
    use windows::core::{w, HSTRING, PCWSTR};
    use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, RECT, TRUE, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, CreateEllipticRgn, DeleteObject, EndPaint, InvalidateRect, SetWindowRgn,
        UpdateWindow, HDC, PAINTSTRUCT,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::ReleaseCapture;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
        GetMessageW, GetWindowLongPtrW, LoadCursorW, PostQuitMessage, RegisterClassW,
        SendMessageW, SetWindowLongPtrW, ShowWindow, TranslateMessage, CREATESTRUCTW, CS_HREDRAW,
        CS_VREDRAW, GWLP_USERDATA, HTCAPTION, IDC_ARROW, MSG, SW_SHOW, WM_DESTROY,
        WM_LBUTTONDOWN, WM_NCCREATE, WM_NCDESTROY, WM_NCLBUTTONDOWN, WM_PAINT, WNDCLASSW,
        WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
    };

    const CLASS_NAME: PCWSTR = w!("TrafficLightOverlay");

    static CLASS_ATOM: OnceCell<u16> = OnceCell::new();

    type ListenerSlot = Weak<dyn WindowListener>;

    fn hwnd(handle: WindowHandle) -> HWND {
        HWND(handle.0 as *mut _)
    }

    fn register_class(hinstance: HINSTANCE) -> Result<u16, AppError> {
        CLASS_ATOM
            .get_or_try_init(|| {
                let wc = WNDCLASSW {
                    style: CS_HREDRAW | CS_VREDRAW,
                    lpfnWndProc: Some(overlay_wndproc),
                    hInstance: hinstance,
                    hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
                    lpszClassName: CLASS_NAME,
                    ..Default::default()
                };
                match unsafe { RegisterClassW(&wc) } {
                    0 => Err(AppError::WindowCreation(format!(
                        "RegisterClassW: {}",
                        windows::core::Error::from_win32()
                    ))),
                    atom => Ok(atom),
                }
            })
            .copied()
    }

    /// Win32 popup window with GDI painting.
    #[derive(Debug, Default)]
    pub struct Win32Window;

    impl WindowSystem for Win32Window {
        fn create_window(
            &self,
            spec: &WindowSpec,
            listener: Weak<dyn WindowListener>,
        ) -> Result<WindowHandle, AppError> {
            let hinstance: HINSTANCE = unsafe { GetModuleHandleW(None) }
                .map_err(|err| AppError::WindowCreation(err.to_string()))?
                .into();
            register_class(hinstance)?;

            // Borrowed for the duration of the call. WM_NCCREATE stores its
            // own copy, so nothing leaks when creation fails early.
            let param: *const ListenerSlot = &listener;
            let title = HSTRING::from(spec.title.as_str());
            let hwnd = unsafe {
                CreateWindowExW(
                    WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                    CLASS_NAME,
                    &title,
                    WS_POPUP,
                    spec.x,
                    spec.y,
                    spec.width,
                    spec.height,
                    None,
                    None,
                    hinstance,
                    Some(param.cast()),
                )
            }
            .map_err(|err| AppError::WindowCreation(format!("CreateWindowExW: {err}")))?;

            Ok(WindowHandle(hwnd.0 as isize))
        }

        fn set_round_region(
            &self,
            window: WindowHandle,
            width: i32,
            height: i32,
        ) -> Result<(), AppError> {
            let region = unsafe { CreateEllipticRgn(0, 0, width, height) };
            if region.0.is_null() {
                return Err(AppError::ShapeRegion("CreateEllipticRgn failed".into()));
            }
            // On success the window owns the region.
            if unsafe { SetWindowRgn(hwnd(window), region, TRUE) } == 0 {
                unsafe {
                    let _ = DeleteObject(region);
                }
                return Err(AppError::ShapeRegion("SetWindowRgn failed".into()));
            }
            Ok(())
        }

        fn show(&self, window: WindowHandle) {
            unsafe {
                let _ = ShowWindow(hwnd(window), SW_SHOW);
                let _ = UpdateWindow(hwnd(window));
            }
        }

        fn invalidate(&self, window: WindowHandle) {
            unsafe {
                let _ = InvalidateRect(hwnd(window), None, TRUE);
            }
        }

        fn destroy(&self, window: WindowHandle) {
            if let Err(err) = unsafe { DestroyWindow(hwnd(window)) } {
                tracing::warn!(%err, "DestroyWindow failed");
            }
        }

        fn post_quit(&self, exit_code: i32) {
            unsafe { PostQuitMessage(exit_code) };
        }

        fn run_message_loop(&self) -> i32 {
            let mut msg = MSG::default();
            loop {
                let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                match r.0 {
                    0 => return msg.wParam.0 as i32,
                    -1 => {
                        tracing::error!(
                            err = %windows::core::Error::from_win32(),
                            "GetMessageW failed; leaving message loop"
                        );
                        return 1;
                    }
                    _ => unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    },
                }
            }
        }
    }

    /// `BeginPaint`/`EndPaint` pair; the scope closes on drop.
    struct PaintScope {
        hwnd: HWND,
        paint: PAINTSTRUCT,
        hdc: HDC,
    }

    impl PaintScope {
        fn begin(hwnd: HWND) -> Self {
            let mut paint = PAINTSTRUCT::default();
            let hdc = unsafe { BeginPaint(hwnd, &mut paint) };
            Self { hwnd, paint, hdc }
        }

        fn hdc(&self) -> Option<HDC> {
            (!self.hdc.0.is_null()).then_some(self.hdc)
        }
    }

    impl Drop for PaintScope {
        fn drop(&mut self) {
            unsafe {
                let _ = EndPaint(self.hwnd, &self.paint);
            }
        }
    }

    fn client_size(hwnd: HWND) -> (i32, i32) {
        let mut rect = RECT::default();
        if unsafe { GetClientRect(hwnd, &mut rect) }.is_err() {
            return (0, 0);
        }
        (rect.right - rect.left, rect.bottom - rect.top)
    }

    struct NativeHandler {
        hwnd: HWND,
        listener: Option<Rc<dyn WindowListener>>,
    }

    impl WindowEventHandler for NativeHandler {
        fn paint(&mut self) {
            let scope = PaintScope::begin(self.hwnd);
            if let (Some(listener), Some(hdc)) = (&self.listener, scope.hdc()) {
                let (width, height) = client_size(self.hwnd);
                let mut canvas = GdiCanvas::new(hdc);
                listener.paint(&mut canvas, width, height);
            }
        }

        fn begin_drag(&mut self) {
            // The caption drag runs a modal loop that re-enters the window
            // procedure, so nothing may be borrowed across this call.
            unsafe {
                let _ = ReleaseCapture();
                SendMessageW(
                    self.hwnd,
                    WM_NCLBUTTONDOWN,
                    WPARAM(HTCAPTION as usize),
                    LPARAM(0),
                );
            }
        }

        fn destroyed(&mut self) {
            if let Some(listener) = &self.listener {
                listener.destroyed();
            }
        }
    }

    fn classify(msg: u32) -> WindowEvent {
        match msg {
            WM_PAINT => WindowEvent::Paint,
            WM_LBUTTONDOWN => WindowEvent::PrimaryButtonDown,
            WM_DESTROY => WindowEvent::Destroy,
            _ => WindowEvent::Other,
        }
    }

    unsafe extern "system" fn overlay_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        if msg == WM_NCCREATE {
            let create = unsafe { &*(lparam.0 as *const CREATESTRUCTW) };
            let param = create.lpCreateParams as *const ListenerSlot;
            if !param.is_null() {
                // Reclaimed at WM_NCDESTROY.
                let slot = Box::into_raw(Box::new(unsafe { &*param }.clone()));
                unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, slot as isize) };
            }
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }

        let slot = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut ListenerSlot;

        if msg == WM_NCDESTROY {
            if !slot.is_null() {
                unsafe {
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                    drop(Box::from_raw(slot));
                }
            }
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }

        let listener = if slot.is_null() {
            None
        } else {
            unsafe { &*slot }.upgrade()
        };
        let mut handler = NativeHandler { hwnd, listener };
        match dispatch_window_event(classify(msg), &mut handler) {
            Disposition::Handled => LRESULT(0),
            Disposition::Default => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingHandler {
        calls: Vec<&'static str>,
    }

    impl WindowEventHandler for RecordingHandler {
        fn paint(&mut self) {
            self.calls.push("paint");
        }

        fn begin_drag(&mut self) {
            self.calls.push("drag");
        }

        fn destroyed(&mut self) {
            self.calls.push("destroyed");
        }
    }

    #[derive(Default)]
    struct CountingSystem {
        destroys: Rc<RefCell<Vec<WindowHandle>>>,
    }

    impl WindowSystem for CountingSystem {
        fn create_window(
            &self,
            _spec: &WindowSpec,
            _listener: Weak<dyn WindowListener>,
        ) -> Result<WindowHandle, AppError> {
            Ok(WindowHandle(7))
        }

        fn set_round_region(&self, _: WindowHandle, _: i32, _: i32) -> Result<(), AppError> {
            Ok(())
        }

        fn show(&self, _: WindowHandle) {}

        fn invalidate(&self, _: WindowHandle) {}

        fn destroy(&self, window: WindowHandle) {
            self.destroys.borrow_mut().push(window);
        }

        fn post_quit(&self, _: i32) {}

        fn run_message_loop(&self) -> i32 {
            0
        }
    }

    struct NoListener;

    impl WindowListener for NoListener {
        fn paint(&self, _: &mut dyn Canvas, _: i32, _: i32) {}
        fn destroyed(&self) {}
    }

    fn detached() -> Weak<dyn WindowListener> {
        Weak::<NoListener>::new()
    }

    #[test]
    fn routes_each_recognised_message_to_its_action() {
        let mut handler = RecordingHandler::default();
        assert_eq!(
            dispatch_window_event(WindowEvent::Paint, &mut handler),
            Disposition::Handled
        );
        assert_eq!(
            dispatch_window_event(WindowEvent::PrimaryButtonDown, &mut handler),
            Disposition::Handled
        );
        assert_eq!(
            dispatch_window_event(WindowEvent::Destroy, &mut handler),
            Disposition::Handled
        );
        assert_eq!(handler.calls, vec!["paint", "drag", "destroyed"]);
    }

    #[test]
    fn unrecognised_messages_fall_back_to_default_handling() {
        let mut handler = RecordingHandler::default();
        assert_eq!(
            dispatch_window_event(WindowEvent::Other, &mut handler),
            Disposition::Default
        );
        assert!(handler.calls.is_empty());
    }

    #[test]
    fn geometry_comes_from_settings() {
        let settings = Settings {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
            window_title: "Beacon".into(),
            ..Settings::default()
        };
        let spec = WindowSpec::from_settings(&settings);
        assert_eq!(
            spec,
            WindowSpec {
                title: "Beacon".into(),
                x: 10,
                y: 20,
                width: 30,
                height: 40,
            }
        );
    }

    #[test]
    fn destroy_is_issued_once() {
        let destroys = Rc::new(RefCell::new(Vec::new()));
        let controller = WindowController::new(Box::new(CountingSystem {
            destroys: Rc::clone(&destroys),
        }));
        let spec = WindowSpec::from_settings(&Settings::default());
        controller.create(&spec, detached()).expect("create");

        assert!(controller.destroy());
        assert!(!controller.destroy());
        assert_eq!(*destroys.borrow(), vec![WindowHandle(7)]);
    }

    #[test]
    fn shaping_without_a_window_is_a_region_error() {
        let controller = WindowController::new(Box::new(CountingSystem::default()));
        assert!(matches!(
            controller.apply_round_shape(10, 10),
            Err(AppError::ShapeRegion(_))
        ));
    }

    #[test]
    fn mark_destroyed_prevents_a_second_native_destroy() {
        let destroys = Rc::new(RefCell::new(Vec::new()));
        let controller = WindowController::new(Box::new(CountingSystem {
            destroys: Rc::clone(&destroys),
        }));
        let spec = WindowSpec::from_settings(&Settings::default());
        controller.create(&spec, detached()).expect("create");

        controller.mark_destroyed();
        assert!(!controller.destroy());
        assert!(destroys.borrow().is_empty());
    }
}
