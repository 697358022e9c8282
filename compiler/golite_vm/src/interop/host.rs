//! Host types bridged into scripts.
//!
//! A [`HostType<T>`] registers a Rust type under a script-visible name with
//! an explicit table of field accessors and methods. Values of the type
//! travel through scripts as [`External`]s: an opaque shared handle plus the
//! registration, which is all the VM needs for field reads and writes,
//! method calls, construction and type assertions.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::{undefined_member, EvalError, EvalResult};
use crate::types::{TypeDesc, TypeKind};
use crate::value::Value;

type Getter = Box<dyn Fn(&dyn Any) -> Option<Value>>;
type Setter = Box<dyn Fn(&mut dyn Any, Value) -> EvalResult<()>>;
type HostMethod = Box<dyn Fn(&mut dyn Any, &[Value]) -> EvalResult>;

struct HostField {
    get: Getter,
    set: Option<Setter>,
}

/// Registration of a host type: its name and accessor tables.
pub struct HostTypeInfo {
    name: Rc<str>,
    type_id: TypeId,
    fields: FxHashMap<Rc<str>, HostField>,
    methods: FxHashMap<Rc<str>, HostMethod>,
    construct: Option<Box<dyn Fn() -> Box<dyn Any>>>,
    display: Option<Box<dyn Fn(&dyn Any) -> String>>,
}

impl HostTypeInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// A fresh value from the registered constructor, if any.
    pub fn construct(self: &Rc<Self>) -> Option<Value> {
        let make = self.construct.as_ref()?;
        Some(Value::External(External {
            info: Rc::clone(self),
            handle: Rc::new(RefCell::new(make())),
        }))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl fmt::Debug for HostTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTypeInfo")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`HostType`].
pub struct HostTypeBuilder<T> {
    info: HostTypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> HostTypeBuilder<T> {
    /// Read-only field.
    #[must_use]
    pub fn field(mut self, name: &str, get: impl Fn(&T) -> Value + 'static) -> Self {
        self.info.fields.insert(
            Rc::from(name),
            HostField {
                get: Box::new(move |any| any.downcast_ref::<T>().map(&get)),
                set: None,
            },
        );
        self
    }

    /// Field scripts can assign to.
    #[must_use]
    pub fn field_mut(
        mut self,
        name: &str,
        get: impl Fn(&T) -> Value + 'static,
        set: impl Fn(&mut T, Value) -> EvalResult<()> + 'static,
    ) -> Self {
        let type_name = Rc::clone(&self.info.name);
        self.info.fields.insert(
            Rc::from(name),
            HostField {
                get: Box::new(move |any| any.downcast_ref::<T>().map(&get)),
                set: Some(Box::new(move |any, value| match any.downcast_mut::<T>() {
                    Some(target) => set(target, value),
                    None => Err(wrong_host_type(&type_name)),
                })),
            },
        );
        self
    }

    /// Method receiving the host value mutably and the script arguments.
    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        method: impl Fn(&mut T, &[Value]) -> EvalResult + 'static,
    ) -> Self {
        let type_name = Rc::clone(&self.info.name);
        self.info.methods.insert(
            Rc::from(name),
            Box::new(move |any, args| match any.downcast_mut::<T>() {
                Some(target) => method(target, args),
                None => Err(wrong_host_type(&type_name)),
            }),
        );
        self
    }

    /// Constructor used for `T{...}` literals, `new(T)` and zero values.
    #[must_use]
    pub fn constructor(mut self, make: impl Fn() -> T + 'static) -> Self {
        self.info.construct = Some(Box::new(move || Box::new(make()) as Box<dyn Any>));
        self
    }

    /// Rendering used by `print` and `println`.
    #[must_use]
    pub fn display(mut self, show: impl Fn(&T) -> String + 'static) -> Self {
        self.info.display = Some(Box::new(move |any| {
            any.downcast_ref::<T>().map(&show).unwrap_or_default()
        }));
        self
    }

    pub fn build(self) -> HostType<T> {
        let info = Rc::new(self.info);
        let desc = TypeDesc::named(
            Rc::clone(&info.name),
            TypeKind::External(Rc::clone(&info)),
        );
        HostType {
            info,
            desc,
            _marker: PhantomData,
        }
    }
}

fn wrong_host_type(name: &str) -> EvalError {
    EvalError::host(format!("host value is not a {name}"))
}

/// A registered host type.
pub struct HostType<T> {
    info: Rc<HostTypeInfo>,
    desc: Rc<TypeDesc>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for HostType<T> {
    fn clone(&self) -> Self {
        HostType {
            info: Rc::clone(&self.info),
            desc: Rc::clone(&self.desc),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> HostType<T> {
    /// Start registering `T` under the script name `name`.
    pub fn builder(name: &str) -> HostTypeBuilder<T> {
        HostTypeBuilder {
            info: HostTypeInfo {
                name: Rc::from(name),
                type_id: TypeId::of::<T>(),
                fields: FxHashMap::default(),
                methods: FxHashMap::default(),
                construct: None,
                display: None,
            },
            _marker: PhantomData,
        }
    }

    /// Wrap a host value for use in scripts.
    pub fn wrap(&self, value: T) -> Value {
        Value::External(External {
            info: Rc::clone(&self.info),
            handle: Rc::new(RefCell::new(Box::new(value))),
        })
    }

    /// The type as a script value, for binding its name.
    pub fn descriptor(&self) -> Rc<TypeDesc> {
        Rc::clone(&self.desc)
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

/// A host value inside a script.
///
/// Copies share the underlying host value.
#[derive(Clone)]
pub struct External {
    info: Rc<HostTypeInfo>,
    handle: Rc<RefCell<Box<dyn Any>>>,
}

impl External {
    pub fn type_name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &Rc<HostTypeInfo> {
        &self.info
    }

    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.handle).cast::<()>() as usize
    }

    /// Whether this value was registered as `info`'s type.
    pub fn is_instance_of(&self, info: &Rc<HostTypeInfo>) -> bool {
        Rc::ptr_eq(&self.info, info) || self.info.type_id == info.type_id
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.info.has_field(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.info.has_method(name)
    }

    fn busy(&self) -> EvalError {
        EvalError::host(format!("{} value is already in use", self.info.name))
    }

    pub fn get_field(&self, name: &str) -> EvalResult {
        let field = self
            .info
            .fields
            .get(name)
            .ok_or_else(|| undefined_member(name, self.type_name()))?;
        let handle = self.handle.try_borrow().map_err(|_| self.busy())?;
        (field.get)(&**handle).ok_or_else(|| wrong_host_type(&self.info.name))
    }

    pub fn set_field(&self, name: &str, value: Value) -> EvalResult<()> {
        let field = self
            .info
            .fields
            .get(name)
            .ok_or_else(|| undefined_member(name, self.type_name()))?;
        let Some(set) = &field.set else {
            return Err(EvalError::host(format!(
                "cannot assign to read-only field {}.{name}",
                self.info.name
            )));
        };
        let mut handle = self.handle.try_borrow_mut().map_err(|_| self.busy())?;
        set(&mut **handle, value)
    }

    pub fn call_method(&self, name: &str, args: &[Value]) -> EvalResult {
        let method = self
            .info
            .methods
            .get(name)
            .ok_or_else(|| undefined_member(name, self.type_name()))?;
        let mut handle = self.handle.try_borrow_mut().map_err(|_| self.busy())?;
        method(&mut **handle, args)
    }

    /// Rendering for `print`: the registered display hook, or `<Name>`.
    pub fn display(&self) -> String {
        match (&self.info.display, self.handle.try_borrow()) {
            (Some(show), Ok(handle)) => show(&**handle),
            _ => format!("<{}>", self.info.name),
        }
    }

    /// Run `f` on the host value if it is a `T`.
    pub fn with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let handle = self.handle.try_borrow().ok()?;
        handle.downcast_ref::<T>().map(f)
    }
}

impl fmt::Debug for External {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "External({} @ {:#x})", self.info.name, self.address())
    }
}
