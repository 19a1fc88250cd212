//! This module provides ways to tweak mocked backends, so that they can return errors on some tests

use crate::error::{Error, Result};

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    // From the SourceRegistry trait
    pub list_sources_behaviour: (u32, u32),
    pub connect_behaviour: (u32, u32),
    pub commit_source_behaviour: (u32, u32),
    pub remove_source_behaviour: (u32, u32),

    // From the CalClient trait
    pub get_object_list_behaviour: (u32, u32),
    pub create_object_behaviour: (u32, u32),
    pub modify_object_behaviour: (u32, u32),
    pub remove_object_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            list_sources_behaviour: (0, n_fails),
            connect_behaviour: (0, n_fails),
            commit_source_behaviour: (0, n_fails),
            remove_source_behaviour: (0, n_fails),
            get_object_list_behaviour: (0, n_fails),
            create_object_behaviour: (0, n_fails),
            modify_object_behaviour: (0, n_fails),
            remove_object_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_list_sources(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_sources_behaviour, "list_sources")
    }
    pub fn can_connect(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.connect_behaviour, "connect")
    }
    pub fn can_commit_source(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.commit_source_behaviour, "commit_source")
    }
    pub fn can_remove_source(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.remove_source_behaviour, "remove_source")
    }
    pub fn can_get_object_list(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.get_object_list_behaviour, "get_object_list")
    }
    pub fn can_create_object(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.create_object_behaviour, "create_object")
    }
    pub fn can_modify_object(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.modify_object_behaviour, "modify_object")
    }
    pub fn can_remove_object(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.remove_object_behaviour, "remove_object")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<()> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            Err(Error::Backend(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        for _ in 0..5 {
            assert!(ok.can_connect().is_ok());
        }

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_connect().is_err());
        assert!(now.can_create_object().is_err());
        assert!(now.can_create_object().is_err());
        assert!(now.can_connect().is_err());
        assert!(now.can_connect().is_ok());
        assert!(now.can_connect().is_ok());
        assert!(now.can_create_object().is_ok());

        let mut custom = MockBehaviour{
            connect_behaviour: (0,1),
            remove_object_behaviour: (1,3),
            ..MockBehaviour::default()
        };
        assert!(custom.can_connect().is_err());
        assert!(custom.can_connect().is_ok());
        assert!(custom.can_connect().is_ok());
        assert!(custom.can_remove_object().is_ok());
        assert!(custom.can_remove_object().is_err());
        assert!(custom.can_remove_object().is_err());
        assert!(custom.can_remove_object().is_err());
        assert!(custom.can_remove_object().is_ok());

        let mut suspended = MockBehaviour::fail_now(1);
        suspended.suspend();
        assert!(suspended.can_modify_object().is_ok());
        suspended.resume();
        assert!(suspended.can_modify_object().is_err());
    }
}
