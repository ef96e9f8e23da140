use crate::identifier::Identifier;
use crate::value::Val;
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc};

/// Storage for one variable. `None` until the variable is first assigned.
pub type Cell = Rc<RefCell<Option<Val>>>;
pub type ScopeLink = Rc<RefCell<Scope>>;

#[derive(Default)]
pub struct Scope {
    cells: FxHashMap<Identifier, Cell>,
    parent: Option<ScopeLink>,
}

impl Scope {
    pub fn new_root() -> ScopeLink {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn new_child(this: &ScopeLink) -> ScopeLink {
        Rc::new(RefCell::new(Scope {
            cells: Default::default(),
            parent: Some(this.clone()),
        }))
    }

    pub fn try_get_here(&self, id: &Identifier) -> Option<Cell> {
        self.cells.get(id).cloned()
    }

    /// Nearest cell named `id`, walking outwards through the parents.
    pub fn lookup(&self, id: &Identifier) -> Option<Cell> {
        if let Some(cell) = self.try_get_here(id) {
            return Some(cell);
        }

        let mut cur = self.parent.clone();
        while let Some(scope) = cur {
            let borrow = (*scope).borrow();
            if let Some(cell) = borrow.try_get_here(id) {
                return Some(cell);
            }
            cur = borrow.parent.clone();
        }
        None
    }

    /// Adds a fresh unassigned cell in this frame. Cells of the same name in
    /// parent frames are shadowed, never touched.
    pub fn declare(&mut self, id: Identifier) {
        self.cells.insert(id, Rc::new(RefCell::new(None)));
    }

    pub fn define(&mut self, id: Identifier, val: Val) {
        self.cells.insert(id, Rc::new(RefCell::new(Some(val))));
    }

    /// Makes an existing cell visible here under `id`. Writes through either
    /// name are seen by both.
    pub fn bind(&mut self, id: Identifier, cell: Cell) {
        self.cells.insert(id, cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_to_parent() {
        let root = Scope::new_root();
        root.borrow_mut().define("x".into(), Val::Num(1.0));
        let child = Scope::new_child(&root);
        let cell = child.borrow().lookup(&"x".into()).unwrap();
        assert_eq!(*cell.borrow(), Some(Val::Num(1.0)));
    }

    #[test]
    fn declare_shadows_without_touching_parent() {
        let root = Scope::new_root();
        root.borrow_mut().define("a".into(), Val::Num(0.0));
        let child = Scope::new_child(&root);
        child.borrow_mut().declare("a".into());

        let inner = child.borrow().lookup(&"a".into()).unwrap();
        *inner.borrow_mut() = Some(Val::Num(99.0));

        let outer = root.borrow().lookup(&"a".into()).unwrap();
        assert_eq!(*outer.borrow(), Some(Val::Num(0.0)));
    }

    #[test]
    fn bound_cells_are_shared() {
        let source = Scope::new_root();
        source.borrow_mut().define("n".into(), Val::Num(1.0));
        let cell = source.borrow().try_get_here(&"n".into()).unwrap();

        let importer = Scope::new_root();
        importer.borrow_mut().bind("n".into(), cell.clone());
        *cell.borrow_mut() = Some(Val::Num(2.0));

        let seen = importer.borrow().lookup(&"n".into()).unwrap();
        assert_eq!(*seen.borrow(), Some(Val::Num(2.0)));
    }

    #[test]
    fn missing_name_is_none() {
        let root = Scope::new_root();
        let child = Scope::new_child(&root);
        assert!(child.borrow().lookup(&"nope".into()).is_none());
    }
}
