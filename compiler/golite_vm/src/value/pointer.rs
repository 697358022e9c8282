//! Pointers to storage locations.

use std::fmt;
use std::rc::Rc;

use super::{ListRef, MapKey, MapRef, Value};
use crate::environment::Cell;
use crate::errors::{immutable_list, index_out_of_bounds, nil_dereference, EvalResult};
use crate::interop::External;

/// A storage location a script can read and write through.
#[derive(Clone)]
pub enum Pointer {
    /// A variable, or a value moved to the heap by `&T{...}` or `new`.
    Cell(Cell),
    /// Element of a list.
    Elem(ListRef, usize),
    /// Entry of a map; the key value is kept for inserting on first write.
    Entry(MapRef, MapKey, Rc<Value>),
    /// Field of the struct another pointer refers to.
    Field(Rc<Pointer>, usize),
    /// Field of a host value.
    HostField(External, Rc<str>),
}

impl Pointer {
    /// Current value at the location.
    pub fn get(&self) -> EvalResult<Value> {
        match self {
            Pointer::Cell(cell) => Ok(cell.borrow().clone()),
            Pointer::Elem(list, index) => {
                let list = list.borrow();
                list.items
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| index_out_of_bounds(to_i64(*index), list.items.len()))
            }
            Pointer::Entry(map, id, _) => {
                let map = map.borrow();
                Ok(map
                    .get_by_id(id)
                    .cloned()
                    .unwrap_or_else(|| map.zero_elem()))
            }
            Pointer::Field(parent, index) => match parent.get()? {
                Value::Struct(s) => s.fields.get(*index).cloned().ok_or_else(nil_dereference),
                _ => Err(nil_dereference()),
            },
            Pointer::HostField(ext, name) => ext.get_field(name),
        }
    }

    /// Overwrite the value at the location.
    pub fn set(&self, value: Value) -> EvalResult<()> {
        match self {
            Pointer::Elem(list, index) => {
                let mut list = list.borrow_mut();
                if !list.mutable {
                    return Err(immutable_list());
                }
                let value = list.coerce(value);
                let len = list.items.len();
                let slot = list
                    .items
                    .get_mut(*index)
                    .ok_or_else(|| index_out_of_bounds(to_i64(*index), len))?;
                *slot = value;
                Ok(())
            }
            Pointer::Entry(map, id, key) => {
                map.borrow_mut()
                    .insert_by_id(id.clone(), Value::clone(key), value)
            }
            Pointer::HostField(ext, name) => ext.set_field(name, value),
            Pointer::Cell(_) | Pointer::Field(..) => self.update(|slot| {
                *slot = Value::assign_over(slot, value);
                Ok(())
            }),
        }
    }

    /// Apply `f` to the value at the location in place.
    ///
    /// `f` must not access the same location through another path.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> EvalResult<R>) -> EvalResult<R> {
        self.update_boxed(Box::new(f))
    }

    // Boxed so the recursion through `Field` parents stays one instantiation.
    fn update_boxed<'f, R>(
        &self,
        f: Box<dyn FnOnce(&mut Value) -> EvalResult<R> + 'f>,
    ) -> EvalResult<R> {
        match self {
            Pointer::Cell(cell) => f(&mut cell.borrow_mut()),
            Pointer::Elem(list, index) => {
                let mut list = list.borrow_mut();
                if !list.mutable {
                    return Err(immutable_list());
                }
                let len = list.items.len();
                let slot = list
                    .items
                    .get_mut(*index)
                    .ok_or_else(|| index_out_of_bounds(to_i64(*index), len))?;
                f(slot)
            }
            Pointer::Field(parent, index) => {
                let index = *index;
                parent.update_boxed(Box::new(move |value: &mut Value| match value {
                    Value::Struct(s) => match s.fields.get_mut(index) {
                        Some(slot) => f(slot),
                        None => Err(nil_dereference()),
                    },
                    _ => Err(nil_dereference()),
                }))
            }
            Pointer::Entry(..) | Pointer::HostField(..) => {
                let mut value = self.get()?;
                let result = f(&mut value)?;
                self.set(value)?;
                Ok(result)
            }
        }
    }

    /// Identity of the location, as a base address and an offset within it.
    pub fn address(&self) -> (usize, usize) {
        match self {
            Pointer::Cell(cell) => (Rc::as_ptr(cell) as usize, 0),
            Pointer::Elem(list, index) => (Rc::as_ptr(list) as usize, index + 1),
            Pointer::Entry(map, id, _) => {
                use std::hash::{Hash, Hasher};
                let mut hasher = rustc_hash::FxHasher::default();
                id.hash(&mut hasher);
                (Rc::as_ptr(map) as usize, hasher.finish() as usize)
            }
            Pointer::Field(parent, index) => {
                let (base, offset) = parent.address();
                (base, offset.wrapping_mul(64).wrapping_add(index + 1))
            }
            Pointer::HostField(ext, name) => {
                (ext.address(), Rc::as_ptr(name).cast::<u8>() as usize)
            }
        }
    }

    /// Whether both pointers refer to the same location.
    pub fn ptr_eq(&self, other: &Pointer) -> bool {
        match (self, other) {
            (Pointer::Cell(a), Pointer::Cell(b)) => Rc::ptr_eq(a, b),
            (Pointer::Elem(a, i), Pointer::Elem(b, j)) => Rc::ptr_eq(a, b) && i == j,
            (Pointer::Entry(a, k, _), Pointer::Entry(b, l, _)) => Rc::ptr_eq(a, b) && k == l,
            (Pointer::Field(a, i), Pointer::Field(b, j)) => i == j && a.ptr_eq(b),
            (Pointer::HostField(a, m), Pointer::HostField(b, n)) => {
                a.address() == b.address() && m == n
            }
            _ => false,
        }
    }
}

fn to_i64(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Pointer::Cell(_) => "Cell",
            Pointer::Elem(..) => "Elem",
            Pointer::Entry(..) => "Entry",
            Pointer::Field(..) => "Field",
            Pointer::HostField(..) => "HostField",
        };
        let (base, offset) = self.address();
        write!(f, "Pointer::{kind}({base:#x}+{offset})")
    }
}
