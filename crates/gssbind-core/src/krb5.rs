//! The system Kerberos mechanism, through libgssapi.
//!
//! Every call passes the default credential (`GSS_C_NO_CREDENTIAL`) and the
//! library's default mechanism (`GSS_C_NO_OID`). The initiator uses the
//! caller's credential cache; the acceptor uses the keytab registered with
//! [`Mechanism::register_acceptor_identity`] or the system default. Minor
//! statuses are displayed as Kerberos codes.

use std::{
    ffi::{c_char, c_int, c_void, CString},
    os::unix::ffi::OsStrExt,
    path::Path,
    ptr::NonNull,
};

use libgssapi_sys::{
    gss_OID, gss_accept_sec_context, gss_buffer_desc, gss_ctx_id_struct, gss_ctx_id_t, gss_delete_sec_context,
    gss_display_name, gss_display_status, gss_import_name, gss_init_sec_context, gss_name_struct, gss_release_buffer,
    gss_release_name, gss_unwrap, gss_wrap, GSS_C_GSS_CODE, GSS_C_MECH_CODE, GSS_C_NT_HOSTBASED_SERVICE,
    GSS_C_NT_MACHINE_UID_NAME, GSS_C_NT_STRING_UID_NAME, GSS_C_NT_USER_NAME, GSS_C_QOP_DEFAULT,
};

use crate::{
    flags::FlagSet,
    mech::{AcceptOutput, InitOutput, Mechanism, Protected},
    name::NameType,
    status::{Status, StatusKind, GSS_S_FAILURE},
    translate::fatal,
};

extern "C" {
    static gss_mech_krb5: gss_OID;
    fn krb5_gss_register_acceptor_identity(path: *const c_char) -> u32;
}

fn check(major: u32, minor: u32) -> Result<Status, Status> {
    let status = Status::new(major, minor);
    if status.is_error() {
        Err(status)
    } else {
        Ok(status)
    }
}

fn empty_buffer() -> gss_buffer_desc {
    gss_buffer_desc {
        length: 0,
        value: std::ptr::null_mut(),
    }
}

/// A borrowed view handed to libgssapi as an input buffer.
fn input_buffer(bytes: &[u8]) -> gss_buffer_desc {
    gss_buffer_desc {
        length: bytes.len(),
        value: bytes.as_ptr() as *mut c_void,
    }
}

fn name_oid(name_type: NameType) -> gss_OID {
    unsafe {
        match name_type {
            NameType::UserName => GSS_C_NT_USER_NAME,
            NameType::MachineUidName => GSS_C_NT_MACHINE_UID_NAME,
            NameType::StringUidName => GSS_C_NT_STRING_UID_NAME,
            NameType::HostbasedService => GSS_C_NT_HOSTBASED_SERVICE,
        }
    }
}

/// A buffer allocated by libgssapi.
pub struct GssBuffer(gss_buffer_desc);
impl AsRef<[u8]> for GssBuffer {
    fn as_ref(&self) -> &[u8] {
        if self.0.value.is_null() || self.0.length == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.0.value as *const u8, self.0.length) }
    }
}
impl Drop for GssBuffer {
    fn drop(&mut self) {
        let mut minor = 0;
        let major = unsafe { gss_release_buffer(&mut minor, &mut self.0) };
        if let Err(status) = check(major, minor) {
            fatal(format_args!("gss_release_buffer failed: {status}"));
        }
    }
}

pub struct NameHandle(NonNull<gss_name_struct>);
impl Drop for NameHandle {
    fn drop(&mut self) {
        let mut minor = 0;
        let mut name = self.0.as_ptr();
        let major = unsafe { gss_release_name(&mut minor, &mut name) };
        if let Err(status) = check(major, minor) {
            fatal(format_args!("gss_release_name failed: {status}"));
        }
    }
}

pub struct ContextHandle(NonNull<gss_ctx_id_struct>);
impl Drop for ContextHandle {
    fn drop(&mut self) {
        let mut minor = 0;
        let mut context = self.0.as_ptr();
        let major = unsafe { gss_delete_sec_context(&mut minor, &mut context, std::ptr::null_mut()) };
        if let Err(status) = check(major, minor) {
            fatal(format_args!("gss_delete_sec_context failed: {status}"));
        }
    }
}

/// Brings the owned handle in line with what libgssapi left in `raw`.
///
/// A new context is adopted even when the call failed, so dropping it
/// deletes it. A context the library already deleted is forgotten.
fn sync_context(context: &mut Option<ContextHandle>, raw: gss_ctx_id_t) {
    match (context.is_some(), NonNull::new(raw)) {
        (false, Some(raw)) => *context = Some(ContextHandle(raw)),
        (true, None) => std::mem::forget(context.take()),
        _ => {}
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Krb5;

impl Mechanism for Krb5 {
    type Name = NameHandle;
    type Context = ContextHandle;
    type Buffer = GssBuffer;

    fn import_name(&self, text: &[u8], name_type: NameType) -> Result<Self::Name, Status> {
        let mut minor = 0;
        let mut buffer = input_buffer(text);
        let mut name = std::ptr::null_mut();
        let major = unsafe { gss_import_name(&mut minor, &mut buffer, name_oid(name_type), &mut name) };
        check(major, minor)?;
        NonNull::new(name).map(NameHandle).ok_or(Status::new(GSS_S_FAILURE, minor))
    }

    fn display_name(&self, name: &Self::Name) -> Result<Self::Buffer, Status> {
        let mut minor = 0;
        let mut buffer = GssBuffer(empty_buffer());
        let major = unsafe { gss_display_name(&mut minor, name.0.as_ptr(), &mut buffer.0, std::ptr::null_mut()) };
        check(major, minor)?;
        Ok(buffer)
    }

    fn init_sec_context(
        &self,
        context: &mut Option<Self::Context>,
        target: &Self::Name,
        flags: FlagSet,
        time_req: u32,
        input: &[u8],
    ) -> Result<InitOutput<Self::Buffer>, Status> {
        let mut minor = 0;
        let mut raw = context.as_ref().map_or(std::ptr::null_mut(), |c| c.0.as_ptr());
        let mut input = input_buffer(input);
        let mut output = GssBuffer(empty_buffer());
        let mut ret_flags = 0;
        let mut time_rec = 0;
        let major = unsafe {
            gss_init_sec_context(
                &mut minor,
                std::ptr::null_mut(),
                &mut raw,
                target.0.as_ptr(),
                std::ptr::null_mut(),
                flags.bits(),
                time_req,
                std::ptr::null_mut(),
                &mut input,
                std::ptr::null_mut(),
                &mut output.0,
                &mut ret_flags,
                &mut time_rec,
            )
        };
        sync_context(context, raw);
        let status = check(major, minor)?;
        Ok(InitOutput {
            status,
            token: output,
            flags: FlagSet::from_bits(ret_flags),
            time_rec,
        })
    }

    fn accept_sec_context(
        &self,
        context: &mut Option<Self::Context>,
        input: &[u8],
    ) -> Result<AcceptOutput<Self::Name, Self::Buffer>, Status> {
        let mut minor = 0;
        let mut raw = context.as_ref().map_or(std::ptr::null_mut(), |c| c.0.as_ptr());
        let mut input = input_buffer(input);
        let mut source = std::ptr::null_mut();
        let mut output = GssBuffer(empty_buffer());
        let mut ret_flags = 0;
        let mut time_rec = 0;
        let major = unsafe {
            gss_accept_sec_context(
                &mut minor,
                &mut raw,
                std::ptr::null_mut(),
                &mut input,
                std::ptr::null_mut(),
                &mut source,
                std::ptr::null_mut(),
                &mut output.0,
                &mut ret_flags,
                &mut time_rec,
                std::ptr::null_mut(),
            )
        };
        sync_context(context, raw);
        let source_name = NonNull::new(source).map(NameHandle);
        let status = check(major, minor)?;
        Ok(AcceptOutput {
            status,
            source_name,
            token: output,
            flags: FlagSet::from_bits(ret_flags),
            time_rec,
        })
    }

    fn wrap(&self, context: &mut Self::Context, conf_req: bool, message: &[u8]) -> Result<Protected<Self::Buffer>, Status> {
        let mut minor = 0;
        let mut input = input_buffer(message);
        let mut output = GssBuffer(empty_buffer());
        let mut conf_state: c_int = 0;
        let major = unsafe {
            gss_wrap(
                &mut minor,
                context.0.as_ptr(),
                c_int::from(conf_req),
                GSS_C_QOP_DEFAULT,
                &mut input,
                &mut conf_state,
                &mut output.0,
            )
        };
        let status = check(major, minor)?;
        Ok(Protected {
            status,
            buffer: output,
            conf_state: conf_state != 0,
        })
    }

    fn unwrap(&self, context: &mut Self::Context, message: &[u8]) -> Result<Protected<Self::Buffer>, Status> {
        let mut minor = 0;
        let mut input = input_buffer(message);
        let mut output = GssBuffer(empty_buffer());
        let mut conf_state: c_int = 0;
        let major = unsafe {
            gss_unwrap(
                &mut minor,
                context.0.as_ptr(),
                &mut input,
                &mut output.0,
                &mut conf_state,
                std::ptr::null_mut(),
            )
        };
        let status = check(major, minor)?;
        Ok(Protected {
            status,
            buffer: output,
            conf_state: conf_state != 0,
        })
    }

    fn display_status(&self, code: u32, kind: StatusKind, cursor: &mut u32) -> Result<Self::Buffer, Status> {
        let (status_type, mech) = match kind {
            StatusKind::Gss => (GSS_C_GSS_CODE, std::ptr::null_mut()),
            StatusKind::Mech => (GSS_C_MECH_CODE, unsafe { gss_mech_krb5 }),
        };
        let mut minor = 0;
        let mut buffer = GssBuffer(empty_buffer());
        let major = unsafe { gss_display_status(&mut minor, code, status_type as c_int, mech, cursor, &mut buffer.0) };
        check(major, minor)?;
        Ok(buffer)
    }

    fn register_acceptor_identity(&self, path: &Path) -> Result<(), Status> {
        let path = CString::new(path.as_os_str().as_bytes()).map_err(|_| Status::new(GSS_S_FAILURE, 0))?;
        let major = unsafe { krb5_gss_register_acceptor_identity(path.as_ptr()) };
        check(major, 0).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accept, initiate,
        status::{GSS_S_BAD_NAME, GSS_S_DEFECTIVE_TOKEN},
        translate::StatusMessages,
        Error, InputToken, PrincipalName,
    };

    #[test]
    fn user_names_display_as_imported() {
        let name = PrincipalName::import(&Krb5, "alice@EXAMPLE.COM", NameType::UserName).unwrap();
        assert_eq!(name.display(&Krb5).unwrap(), "alice@EXAMPLE.COM");
    }

    #[test]
    fn status_messages_come_from_the_library() {
        let messages: Vec<_> = StatusMessages::new(&Krb5, GSS_S_DEFECTIVE_TOKEN, StatusKind::Gss).collect();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].is_empty());
        let messages: Vec<_> = StatusMessages::new(&Krb5, GSS_S_BAD_NAME, StatusKind::Gss).collect();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn garbage_token_is_defective() {
        let err = accept(&Krb5, &InputToken::from(vec![0xde, 0xad, 0xbe, 0xef]), None).unwrap_err();
        let Error::Mechanism(err) = err else {
            panic!("expected a mechanism error, got {err:?}")
        };
        assert_eq!(err.status.routine_error(), GSS_S_DEFECTIVE_TOKEN >> 16);
        assert!(!err.major_messages.is_empty());
    }

    #[test]
    fn initiator_uses_the_library_default_mechanism() {
        let target = PrincipalName::import(&Krb5, "HTTP@gssbind.invalid", NameType::HostbasedService).unwrap();
        match initiate(&Krb5, &target, FlagSet::EMPTY, None, 0, &InputToken::absent()) {
            Ok(step) => assert!(step.token.is_some()),
            Err(Error::Mechanism(err)) => assert!(!err.major_messages.is_empty()),
            Err(err) => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn empty_buffers_release_cleanly() {
        let buffer = GssBuffer(empty_buffer());
        assert!(buffer.as_ref().is_empty());
        drop(buffer);
    }

    #[test]
    fn contexts_follow_the_library() {
        let raw = NonNull::<gss_ctx_id_struct>::dangling();
        let mut context = None;
        sync_context(&mut context, std::ptr::null_mut());
        assert!(context.is_none());

        sync_context(&mut context, raw.as_ptr());
        assert_eq!(context.as_ref().map(|c| c.0), Some(raw), "new contexts are adopted");
        sync_context(&mut context, raw.as_ptr());
        assert_eq!(context.as_ref().map(|c| c.0), Some(raw));

        // The library deleted it; dropping would be a double free.
        sync_context(&mut context, std::ptr::null_mut());
        assert!(context.is_none());
    }
}
