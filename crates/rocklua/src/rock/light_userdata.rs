use std::sync::Arc;

use parking_lot::Mutex;

use crate::lua_vm::{LuaError, LuaResult};
use crate::rock::{ExData, ExValue, Io, Rock};

/// Opaque, type-checked handle wrapping a capability-protocol object.
///
/// The handle exclusively owns the wrapped rock for as long as the value
/// is reachable. The embedded [`ExData`] store lets host code attach
/// auxiliary bookkeeping (buffered-read offsets, connection state) to
/// the handle without touching the wrapped object's own definition.
pub struct LightUserdata {
    value: Arc<dyn Rock>,
    ex: Mutex<ExData<ExValue>>,
}

impl LightUserdata {
    pub fn new(value: Arc<dyn Rock>) -> Self {
        LightUserdata {
            value,
            ex: Mutex::new(ExData::new()),
        }
    }

    pub fn value(&self) -> &Arc<dyn Rock> {
        &self.value
    }

    /// Narrow the wrapped object to the IO capability.
    ///
    /// Fails with a script-visible error naming the object's declared
    /// name and type when the capability is missing.
    pub fn check_io(&self) -> LuaResult<Arc<dyn Io>> {
        self.value.clone().into_io().ok_or_else(|| {
            LuaError::CapabilityMismatch {
                name: self.value.name().to_string(),
                type_name: self.value.type_name().to_string(),
            }
        })
    }

    // ============ Attached extension data ============

    pub fn get(&self, key: &str) -> Option<ExValue> {
        self.ex.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: ExValue) {
        self.ex.lock().set(key, value);
    }

    pub fn del(&self, key: &str) {
        self.ex.lock().del(key);
    }

    pub fn reset(&self) {
        self.ex.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua_value::LuaValue;
    use crate::rock::{RockError, Status, StatusCell, Super};
    use parking_lot::Mutex as PlMutex;

    /// Test resource with the IO capability and a lifecycle cell.
    struct Pipe {
        status: StatusCell,
        buffer: PlMutex<Vec<u8>>,
    }

    impl Pipe {
        fn new() -> Self {
            Pipe {
                status: StatusCell::new(Status::Init),
                buffer: PlMutex::new(Vec::new()),
            }
        }
    }

    impl Rock for Pipe {
        fn name(&self) -> &str {
            "pipe"
        }

        fn type_name(&self) -> &str {
            "pipe"
        }

        fn into_io(self: Arc<Self>) -> Option<Arc<dyn Io>> {
            Some(self)
        }
    }

    impl Io for Pipe {
        fn close(&self) {
            self.status.transition(Status::Close);
        }

        fn start(&self) -> Result<(), RockError> {
            if self.status.transition(Status::Running) {
                Ok(())
            } else {
                Err(RockError::NotFound)
            }
        }

        fn write(&self, value: LuaValue) -> Result<(), RockError> {
            if self.status.load().is_terminal() {
                return Err(RockError::Closed);
            }
            self.buffer.lock().extend_from_slice(value.to_string().as_bytes());
            Ok(())
        }

        fn read(&self) -> Result<Vec<u8>, RockError> {
            if self.status.load().is_terminal() {
                return Err(RockError::Closed);
            }
            Ok(std::mem::take(&mut *self.buffer.lock()))
        }
    }

    #[test]
    fn test_probe_failure_names_object() {
        let ud = LightUserdata::new(Arc::new(Super));
        let err = ud.check_io().err().unwrap();
        assert_eq!(
            err,
            LuaError::CapabilityMismatch {
                name: "super".into(),
                type_name: "super".into(),
            }
        );
    }

    #[test]
    fn test_probe_success_yields_usable_io() {
        let ud = LightUserdata::new(Arc::new(Pipe::new()));
        let io = ud.check_io().unwrap();
        io.start().unwrap();
        io.write(LuaValue::string("abc")).unwrap();
        assert_eq!(io.read().unwrap(), b"abc");
    }

    #[test]
    fn test_closed_resource_rejects_io() {
        let ud = LightUserdata::new(Arc::new(Pipe::new()));
        let io = ud.check_io().unwrap();
        io.close();
        assert!(io.start().is_err());
        assert_eq!(io.write(LuaValue::integer(1)), Err(RockError::Closed));
        assert_eq!(io.read(), Err(RockError::Closed));
    }

    #[test]
    fn test_handle_extension_data() {
        let ud = LightUserdata::new(Arc::new(Super));
        ud.set("offset", Arc::new(128usize));
        let v = ud.get("offset").unwrap();
        assert_eq!(v.downcast_ref::<usize>(), Some(&128));
        ud.del("offset");
        assert!(ud.get("offset").is_none());
        ud.set("a", Arc::new(1u8));
        ud.reset();
        assert!(ud.get("a").is_none());
    }

    #[test]
    fn test_to_light_userdata() {
        let rock = Arc::new(Pipe::new());
        let ud = rock.to_light_userdata();
        assert_eq!(ud.value().name(), "pipe");
        assert!(ud.check_io().is_ok());
    }
}
