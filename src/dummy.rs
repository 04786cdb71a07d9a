//! This module implements a dummy backend that allows inputting data, but has no support for
//! solving. It declares native SOS2 support, so models built against it keep SOS2 sets as
//! declarations, which makes it useful for inspecting and writing problems.
//!
use std::collections::HashMap;

use crate::*;

pub type Model = ModelAPI<Backend>;

/// Simple backend object that accepts any problem and any parameter. It only stores parameters,
/// it does not support solving.
#[derive(Default)]
pub struct Backend {
    name       : Option<String>,
    parameters : HashMap<String,ParameterValue>,
}

impl Backend {
    /// Value of a parameter previously set.
    pub fn parameter(&self, parname : &str) -> Option<&ParameterValue> { self.parameters.get(parname) }
}

impl BaseModelTrait for Backend {
    fn new(name : Option<&str>) -> Self {
        Backend{
            name : name.map(|v| v.to_string()),
            .. Default::default()
        }
    }

    fn capabilities(&self) -> Capabilities { Capabilities{ native_sos2 : true } }

    fn set_parameter(&mut self, parname : &str, parval : ParameterValue) -> Result<()> {
        self.parameters.insert(parname.to_string(),parval);
        Ok(())
    }

    fn solve(&mut self, _data : &ProblemData, _sol : &mut Solution) -> Result<()> {
        Err(Error::Unsupported(format!("solving (model {:?} uses the dummy backend)",self.name.as_deref().unwrap_or(""))))
    }
}
