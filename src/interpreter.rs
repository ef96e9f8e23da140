use crate::expr::RuntimeError;
use crate::identifier::Identifier;
use crate::native::{NativeFunctions, NATIVE_MODULE_NAME};
use crate::parser::{parse_module, ParseError};
use crate::scanner::{scan, ScanError};
use crate::scope::{Scope, ScopeLink};
use crate::statement::{exec_block, Flow, Module};
use crate::value::Val;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use thiserror::Error;
use tracing::{debug, trace, warn};

const MAIN_MODULE_NAME: &str = "Main";

/// A linked program: every module by name, the host natives, and the top-level
/// scope of each module that has started running.
pub struct Program<'a> {
    modules: FxHashMap<Identifier, &'a Module>,
    natives: &'a NativeFunctions,
    loaded: RefCell<FxHashMap<Identifier, ScopeLink>>,
}

impl<'a> Program<'a> {
    fn new(natives: &'a NativeFunctions, modules: &'a [Module]) -> Self {
        let mut by_name = FxHashMap::default();
        for module in modules {
            if by_name.contains_key(&module.name) {
                warn!(module = %module.name, "duplicate module name; keeping the first definition");
                continue;
            }
            by_name.insert(module.name.clone(), module);
        }
        Program {
            modules: by_name,
            natives,
            loaded: Default::default(),
        }
    }

    /// Runs `module`'s body in a fresh top-level scope.
    ///
    /// The scope is registered before the body runs, so a cyclic import sees
    /// the partially initialised module instead of running it again.
    fn run_module(&self, module: &Module) -> Result<(ScopeLink, Flow), RuntimeError> {
        debug!(module = %module.name, "evaluating module");
        let scope = Scope::new_root();
        self.loaded
            .borrow_mut()
            .insert(module.name.clone(), scope.clone());
        let flow = exec_block(&module.body, &scope, self)?;
        debug!(module = %module.name, "finished module");
        Ok((scope, flow))
    }

    fn load(&self, name: &Identifier) -> Result<(ScopeLink, &'a Module), RuntimeError> {
        let module = *self
            .modules
            .get(name)
            .ok_or_else(|| RuntimeError::NoSuchModule { module_name: name.clone() })?;

        let cached = self.loaded.borrow().get(name).cloned();
        if let Some(scope) = cached {
            trace!(module = %name, "module already evaluated");
            return Ok((scope, module));
        }

        let (scope, _) = self.run_module(module)?;
        Ok((scope, module))
    }

    /// Binds each of `names`, exported by `module_name`, into `into`.
    pub fn import(
        &self,
        module_name: &Identifier,
        names: &[Identifier],
        into: &ScopeLink,
    ) -> Result<(), RuntimeError> {
        if module_name.as_str() == NATIVE_MODULE_NAME {
            for name in names {
                let native = self
                    .natives
                    .get(name)
                    .ok_or_else(|| RuntimeError::NoSuchExport { export_name: name.clone() })?;
                (**into)
                    .borrow_mut()
                    .define(name.clone(), Val::NativeFunc(native.clone()));
            }
            return Ok(());
        }

        let (source, module) = self.load(module_name)?;
        for name in names {
            if !module.exports.contains(name) {
                return Err(RuntimeError::NoSuchExport { export_name: name.clone() });
            }
            let cell = (*source)
                .borrow()
                .try_get_here(name)
                .ok_or_else(|| RuntimeError::NotInScope { identifier: name.clone() })?;
            if cell.borrow().is_none() {
                return Err(RuntimeError::UnassignedVariable { identifier: name.clone() });
            }
            (**into).borrow_mut().bind(name.clone(), cell);
        }
        trace!(module = %module_name, count = names.len(), "resolved imports");
        Ok(())
    }
}

/// Links `modules` and runs the one named `Main`. Other modules only run when
/// first imported, and at most once.
pub fn evaluate_program(natives: &NativeFunctions, modules: &[Module]) -> Result<Val, RuntimeError> {
    let mut mains = modules.iter().filter(|m| m.name.as_str() == MAIN_MODULE_NAME);
    let main = mains.next().ok_or(RuntimeError::NoMain)?;
    if mains.next().is_some() {
        return Err(RuntimeError::MultipleMains);
    }

    let program = Program::new(natives, modules);
    match program.run_module(main)? {
        (_, Flow::Return(val)) => Ok(val),
        (_, Flow::Normal) => Ok(Val::Null),
    }
}

#[derive(Debug, Error)]
pub enum InterpretErr {
    #[error("{}", scan_errors(.0))]
    ScanErrs(Vec<ScanError>),
    #[error(transparent)]
    ParseErr(#[from] ParseError),
    #[error(transparent)]
    RuntimeErr(#[from] RuntimeError),
}

fn scan_errors(errs: &[ScanError]) -> String {
    errs.iter()
        .map(ScanError::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Source-level front end: holds parsed modules and the natives they may import.
pub struct Interpreter {
    natives: NativeFunctions,
    modules: Vec<Module>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Self::with_natives(NativeFunctions::standard())
    }

    pub fn with_natives(natives: NativeFunctions) -> Interpreter {
        Interpreter {
            natives,
            modules: vec![],
        }
    }

    /// Scans and parses one module's source, replacing any stored module of the
    /// same name. Returns the module's name.
    pub fn load(&mut self, source: &str) -> Result<Identifier, InterpretErr> {
        let tokens = scan(source).map_err(InterpretErr::ScanErrs)?;
        let module = parse_module(&tokens)?;
        let name = module.name.clone();
        self.modules.retain(|m| m.name != name);
        self.modules.push(module);
        Ok(name)
    }

    pub fn unload(&mut self, name: &Identifier) -> bool {
        let before = self.modules.len();
        self.modules.retain(|m| m.name != *name);
        self.modules.len() != before
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn run(&self) -> Result<Val, InterpretErr> {
        Ok(evaluate_program(&self.natives, &self.modules)?)
    }
}
