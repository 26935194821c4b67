use crate::error::AppError;
use std::cell::Cell;
use std::rc::Weak;

/// One decoded low-level key notification. Consumed synchronously by the
/// listener and then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub vk_code: u32,
    pub scan_code: u32,
    pub flags: u32,
    pub time: u32,
}

/// Transition kind carried by a hook notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMessage {
    KeyDown,
    KeyUp,
    SysKeyDown,
    SysKeyUp,
    Other,
}

impl KeyMessage {
    pub fn is_key_down(self) -> bool {
        matches!(self, Self::KeyDown | Self::SysKeyDown)
    }
}

/// Opaque identifier of an installed process-wide keyboard hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(pub isize);

/// Receives key-down notifications from the hook.
pub trait KeyListener {
    fn key_down(&self, event: &KeyEvent);
}

/// Native side of the hook: installation and removal only. The listener is
/// held weakly so a stale hook can never keep its receiver alive.
pub trait HookSystem {
    fn install(&self, listener: Weak<dyn KeyListener>) -> Result<HookHandle, AppError>;
    fn uninstall(&self, handle: HookHandle) -> Result<(), AppError>;
}

/// Hook callback core. Key-down notifications (including the system
/// variants) reach `listener`; every notification, matched or not, is then
/// handed to `call_next` exactly once. The hook observes and never swallows.
pub fn observe_key_message<R>(
    message: KeyMessage,
    event: Option<KeyEvent>,
    listener: Option<&dyn KeyListener>,
    call_next: impl FnOnce() -> R,
) -> R {
    if message.is_key_down() {
        if let (Some(event), Some(listener)) = (event, listener) {
            listener.key_down(&event);
        }
    }
    call_next()
}

/// Owns the single hook handle and makes removal idempotent.
pub struct KeyboardHook {
    system: Box<dyn HookSystem>,
    handle: Cell<Option<HookHandle>>,
}

impl KeyboardHook {
    pub fn new(system: Box<dyn HookSystem>) -> Self {
        Self {
            system,
            handle: Cell::new(None),
        }
    }

    pub fn install(&self, listener: Weak<dyn KeyListener>) -> Result<HookHandle, AppError> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }

        let handle = self.system.install(listener)?;
        tracing::debug!(?handle, "keyboard hook installed");
        self.handle.set(Some(handle));
        Ok(handle)
    }

    /// Removes the hook if it is installed. Returns whether a native removal
    /// was attempted; later calls are no-ops.
    pub fn uninstall(&self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };

        match self.system.uninstall(handle) {
            Ok(()) => tracing::debug!(?handle, "keyboard hook removed"),
            Err(err) => tracing::warn!(%err, "failed to uninstall keyboard hook"),
        }
        true
    }

    pub fn is_installed(&self) -> bool {
        self.handle.get().is_some()
    }

    pub fn handle(&self) -> Option<HookHandle> {
        self.handle.get()
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(windows)]
pub use platform::Win32KeyboardHook;

#[cfg(windows)]
mod platform {
    use super::{observe_key_message, HookHandle, HookSystem, KeyEvent, KeyListener, KeyMessage};
    use crate::error::AppError;
    use std::cell::RefCell;
    use std::rc::Weak;
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT,
        WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    // Low-level hook procedures get no user-data parameter, so the receiver
    // lives here. The OS calls the procedure on the installing thread.
    thread_local! {
        static LISTENER: RefCell<Option<Weak<dyn KeyListener>>> = RefCell::new(None);
    }

    /// `WH_KEYBOARD_LL` hook serviced by the calling thread's message loop.
    #[derive(Debug, Default)]
    pub struct Win32KeyboardHook;

    impl HookSystem for Win32KeyboardHook {
        fn install(&self, listener: Weak<dyn KeyListener>) -> Result<HookHandle, AppError> {
            let hmodule = unsafe { GetModuleHandleW(None) }
                .map_err(|err| AppError::HookInstall(err.to_string()))?;

            LISTENER.with(|slot| *slot.borrow_mut() = Some(listener));

            let hook = match unsafe {
                SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), hmodule, 0)
            } {
                Ok(hook) if !hook.0.is_null() => hook,
                Ok(_) => {
                    clear_listener();
                    return Err(AppError::HookInstall(
                        windows::core::Error::from_win32().to_string(),
                    ));
                }
                Err(err) => {
                    clear_listener();
                    return Err(AppError::HookInstall(err.to_string()));
                }
            };

            Ok(HookHandle(hook.0 as isize))
        }

        fn uninstall(&self, handle: HookHandle) -> Result<(), AppError> {
            clear_listener();
            unsafe { UnhookWindowsHookEx(HHOOK(handle.0 as *mut _)) }
                .map_err(|err| AppError::HookRemoval(err.to_string()))
        }
    }

    fn clear_listener() {
        LISTENER.with(|slot| *slot.borrow_mut() = None);
    }

    fn classify(w_param: WPARAM) -> KeyMessage {
        match w_param.0 as u32 {
            WM_KEYDOWN => KeyMessage::KeyDown,
            WM_KEYUP => KeyMessage::KeyUp,
            WM_SYSKEYDOWN => KeyMessage::SysKeyDown,
            WM_SYSKEYUP => KeyMessage::SysKeyUp,
            _ => KeyMessage::Other,
        }
    }

    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        let event = (n_code == HC_ACTION as i32).then(|| {
            let info = unsafe { &*(l_param.0 as *const KBDLLHOOKSTRUCT) };
            KeyEvent {
                vk_code: info.vkCode,
                scan_code: info.scanCode,
                flags: info.flags.0,
                time: info.time,
            }
        });
        let message = if event.is_some() {
            classify(w_param)
        } else {
            KeyMessage::Other
        };

        // Upgrade outside the borrow: the listener may reinstall or remove
        // the hook while handling the event.
        let listener = LISTENER.with(|slot| slot.borrow().as_ref().and_then(Weak::upgrade));

        observe_key_message(message, event, listener.as_deref(), || unsafe {
            CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
        })
    }
}
