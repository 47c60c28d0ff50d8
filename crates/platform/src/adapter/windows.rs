use super::PlatformAdapter;
use crate::error::{ErrorKind, Result};
use crate::fill::FillMode;
use exn::ResultExt;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use windows::Win32::System::Com::{
    CLSCTX_LOCAL_SERVER, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx, CoUninitialize,
};
use windows::Win32::UI::Shell::{
    DESKTOP_WALLPAPER_POSITION, DWPOS_CENTER, DWPOS_FILL, DWPOS_FIT, DWPOS_STRETCH, DWPOS_TILE, DesktopWallpaper,
    IDesktopWallpaper,
};
use windows::core::PCWSTR;

fn position(fill: FillMode) -> DESKTOP_WALLPAPER_POSITION {
    match fill {
        FillMode::Zoom => DWPOS_FILL,
        FillMode::Fill => DWPOS_FIT,
        FillMode::Center => DWPOS_CENTER,
        FillMode::Stretch => DWPOS_STRETCH,
        FillMode::Tile => DWPOS_TILE,
    }
}

/// Balances a successful `CoInitializeEx` on every exit path.
struct ComGuard(bool);

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.0 {
            unsafe { CoUninitialize() };
        }
    }
}

/// Windows 8+ through the `IDesktopWallpaper` COM interface; no admin rights
/// needed and every monitor is updated.
pub(crate) struct WindowsAdapter;

impl PlatformAdapter for WindowsAdapter {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn apply(&self, image: &Path, fill: FillMode) -> Result<()> {
        let wide: Vec<u16> = image.as_os_str().encode_wide().chain(std::iter::once(0)).collect();
        unsafe {
            let _com = ComGuard(CoInitializeEx(None, COINIT_APARTMENTTHREADED).is_ok());
            let wallpaper: IDesktopWallpaper =
                CoCreateInstance(&DesktopWallpaper, None, CLSCTX_LOCAL_SERVER).or_raise(|| ErrorKind::Native)?;
            wallpaper.SetPosition(position(fill)).or_raise(|| ErrorKind::Native)?;
            // A null monitor ID applies the image to every monitor.
            wallpaper.SetWallpaper(PCWSTR::null(), PCWSTR::from_raw(wide.as_ptr())).or_raise(|| ErrorKind::Native)?;
        }
        Ok(())
    }
}
