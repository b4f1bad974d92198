//! One-shot UIAccess elevation.
//!
//! A token carrying the UIAccess flag lets the overlay window sit in a band
//! above fullscreen and protected-content windows. Acquiring one requires
//! borrowing the TCB-privileged winlogon token for the current session,
//! impersonating it, and duplicating our own token as a primary token with
//! UIAccess set. On success the process relaunches itself under the new
//! token and exits, so callers only ever observe "already sufficient" or a
//! best-effort failure.

use std::convert::Infallible;
use tracing::{info, warn};
use windows::Win32::Foundation::{BOOL, CloseHandle, ERROR_NOT_FOUND, HANDLE, LUID};
use windows::Win32::Security::{
    DuplicateTokenEx, GetTokenInformation, LUID_AND_ATTRIBUTES, LookupPrivilegeValueW,
    PRIVILEGE_SET, PRIVILEGE_SET_ALL_NECESSARY, PrivilegeCheck, RevertToSelf, SE_TCB_NAME,
    SecurityAnonymous, SecurityImpersonation, SetThreadToken, SetTokenInformation,
    TOKEN_ADJUST_DEFAULT, TOKEN_ASSIGN_PRIMARY, TOKEN_DUPLICATE, TOKEN_IMPERSONATE, TOKEN_QUERY,
    TokenImpersonation, TokenPrimary, TokenSessionId, TokenUIAccess,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Environment::GetCommandLineW;
use windows::Win32::System::Threading::{
    CreateProcessAsUserW, ExitProcess, GetCurrentProcess, GetStartupInfoW, OpenProcess,
    OpenProcessToken, PROCESS_CREATION_FLAGS, PROCESS_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION,
    STARTUPINFOW,
};

/// Outcome observable by the caller; a successful relaunch never returns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Elevation {
    /// The current token already carries UIAccess.
    AlreadySufficient,
    /// Elevation could not be obtained; continue with degraded z-order.
    Unavailable,
}

/// Closes the wrapped token/process handle when dropped.
struct HandleGuard(HANDLE);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }
}

/// Relaunch under a UIAccess token unless the current one already has it.
pub fn ensure_elevated() -> Elevation {
    let already = match token_has_ui_access() {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "could not inspect own token");
            false
        }
    };
    elevate_with(already, relaunch_with_ui_access)
}

/// Decision shell around the relaunch: a no-op when access is already held,
/// otherwise best-effort.
fn elevate_with<F>(already_sufficient: bool, relaunch: F) -> Elevation
where
    F: FnOnce() -> windows::core::Result<Infallible>,
{
    if already_sufficient {
        info!("UIAccess already granted");
        return Elevation::AlreadySufficient;
    }
    match relaunch() {
        Ok(never) => match never {},
        Err(e) => {
            warn!(error = %e, "UIAccess elevation failed, continuing without");
            Elevation::Unavailable
        }
    }
}

fn token_has_ui_access() -> windows::core::Result<bool> {
    unsafe {
        let mut token = HANDLE::default();
        OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token)?;
        let token = HandleGuard(token);
        let mut ui_access: u32 = 0;
        let mut ret_len = 0u32;
        GetTokenInformation(
            token.0,
            TokenUIAccess,
            Some(&mut ui_access as *mut u32 as *mut _),
            size_of::<u32>() as u32,
            &mut ret_len,
        )?;
        Ok(ui_access != 0)
    }
}

fn token_session_id(token: HANDLE) -> windows::core::Result<u32> {
    unsafe {
        let mut session: u32 = 0;
        let mut ret_len = 0u32;
        GetTokenInformation(
            token,
            TokenSessionId,
            Some(&mut session as *mut u32 as *mut _),
            size_of::<u32>() as u32,
            &mut ret_len,
        )?;
        Ok(session)
    }
}

fn exe_name(entry: &PROCESSENTRY32W) -> String {
    let raw = &entry.szExeFile;
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf16_lossy(&raw[..len])
}

fn is_winlogon(name: &str) -> bool {
    name.eq_ignore_ascii_case("winlogon.exe")
}

/// Duplicate the TCB-holding winlogon token of the given session as an
/// impersonation token.
fn duplicate_winlogon_token(session: u32) -> windows::core::Result<HANDLE> {
    unsafe {
        let mut tcb = PRIVILEGE_SET {
            PrivilegeCount: 1,
            Control: PRIVILEGE_SET_ALL_NECESSARY,
            Privilege: [LUID_AND_ATTRIBUTES {
                Luid: LUID::default(),
                Attributes: Default::default(),
            }],
        };
        LookupPrivilegeValueW(None, SE_TCB_NAME, &mut tcb.Privilege[0].Luid)?;

        let snapshot = HandleGuard(CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)?);
        let mut entry = PROCESSENTRY32W {
            dwSize: size_of::<PROCESSENTRY32W>() as u32,
            ..std::mem::zeroed()
        };
        let mut more = Process32FirstW(snapshot.0, &mut entry).is_ok();
        while more {
            if is_winlogon(&exe_name(&entry)) {
                if let Ok(process) =
                    OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, entry.th32ProcessID)
                {
                    let process = HandleGuard(process);
                    let mut token = HANDLE::default();
                    if OpenProcessToken(process.0, TOKEN_QUERY | TOKEN_DUPLICATE, &mut token)
                        .is_ok()
                    {
                        let token = HandleGuard(token);
                        let mut has_tcb = BOOL::default();
                        let tcb_ok = PrivilegeCheck(token.0, &mut tcb, &mut has_tcb).is_ok()
                            && has_tcb.as_bool()
                            && token_session_id(token.0).map_or(false, |s| s == session);
                        if tcb_ok {
                            let mut duplicated = HANDLE::default();
                            DuplicateTokenEx(
                                token.0,
                                TOKEN_IMPERSONATE,
                                None,
                                SecurityImpersonation,
                                TokenImpersonation,
                                &mut duplicated,
                            )?;
                            return Ok(duplicated);
                        }
                    }
                }
            }
            more = Process32NextW(snapshot.0, &mut entry).is_ok();
        }
    }
    Err(windows::core::Error::from(ERROR_NOT_FOUND.to_hresult()))
}

/// Build a primary token equal to our own but with UIAccess set. Requires a
/// momentary winlogon impersonation, reverted before returning.
fn create_ui_access_token() -> windows::core::Result<HANDLE> {
    unsafe {
        let mut own = HANDLE::default();
        OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY | TOKEN_DUPLICATE, &mut own)?;
        let own = HandleGuard(own);
        let session = token_session_id(own.0)?;

        let system = HandleGuard(duplicate_winlogon_token(session)?);
        SetThreadToken(None, Some(system.0))?;

        let result = (|| {
            let mut elevated = HANDLE::default();
            DuplicateTokenEx(
                own.0,
                TOKEN_QUERY | TOKEN_DUPLICATE | TOKEN_ASSIGN_PRIMARY | TOKEN_ADJUST_DEFAULT,
                None,
                SecurityAnonymous,
                TokenPrimary,
                &mut elevated,
            )?;
            let ui_access: u32 = 1;
            if let Err(e) = SetTokenInformation(
                elevated,
                TokenUIAccess,
                &ui_access as *const u32 as *const _,
                size_of::<u32>() as u32,
            ) {
                let _ = CloseHandle(elevated);
                return Err(e);
            }
            Ok(elevated)
        })();

        let _ = RevertToSelf();
        result
    }
}

fn relaunch_with_ui_access() -> windows::core::Result<Infallible> {
    unsafe {
        let token = HandleGuard(create_ui_access_token()?);
        let mut startup = STARTUPINFOW::default();
        GetStartupInfoW(&mut startup);
        let mut process_info = PROCESS_INFORMATION::default();
        CreateProcessAsUserW(
            Some(token.0),
            None,
            Some(GetCommandLineW()),
            None,
            None,
            false,
            PROCESS_CREATION_FLAGS(0),
            None,
            None,
            &startup,
            &mut process_info,
        )?;
        let _ = CloseHandle(process_info.hProcess);
        let _ = CloseHandle(process_info.hThread);
        info!("relaunched with UIAccess");
        ExitProcess(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use windows::Win32::Foundation::E_FAIL;

    #[test]
    fn already_elevated_is_a_no_op() {
        let called = Cell::new(false);
        let outcome = elevate_with(true, || {
            called.set(true);
            Err(windows::core::Error::from(E_FAIL))
        });
        assert_eq!(outcome, Elevation::AlreadySufficient);
        assert!(!called.get());
    }

    #[test]
    fn relaunch_failure_degrades_to_unavailable() {
        let outcome = elevate_with(false, || Err(windows::core::Error::from(E_FAIL)));
        assert_eq!(outcome, Elevation::Unavailable);
    }

    #[test]
    fn winlogon_match_is_case_insensitive() {
        assert!(is_winlogon("winlogon.exe"));
        assert!(is_winlogon("WinLogon.EXE"));
        assert!(!is_winlogon("winlogon"));
        assert!(!is_winlogon("notwinlogon.exe"));
    }
}
