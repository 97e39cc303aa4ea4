use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    JdiError, JdiValue, MethodRef, ObjectId, ObjectRef, PrimitiveKind, ReferenceType,
    ReferenceTypeId, Result, ThreadId, TypeKind, VirtualMachine,
};

const OBJECT: &str = "java.lang.Object";
const STRING: &str = "java.lang.String";
const TO_STRING_SIG: &str = "()Ljava/lang/String;";

type Hook = Arc<dyn Fn(&[JdiValue]) -> Result<JdiValue> + Send + Sync>;

/// What a mocked method does when invoked.
#[derive(Clone)]
pub enum MethodBehavior {
    Return(JdiValue),
    /// Return a freshly allocated `java.lang.String`.
    ReturnString(String),
    /// Throw a new instance of the named exception type.
    Throw(String),
    /// Run arbitrary test code. The mock's lock is not held while the hook
    /// runs, so hooks may block or poke the mock.
    Hook(Hook),
}

impl MethodBehavior {
    pub fn hook(f: impl Fn(&[JdiValue]) -> Result<JdiValue> + Send + Sync + 'static) -> Self {
        MethodBehavior::Hook(Arc::new(f))
    }
}

impl fmt::Debug for MethodBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBehavior::Return(value) => f.debug_tuple("Return").field(value).finish(),
            MethodBehavior::ReturnString(value) => {
                f.debug_tuple("ReturnString").field(value).finish()
            }
            MethodBehavior::Throw(ty) => f.debug_tuple("Throw").field(ty).finish(),
            MethodBehavior::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Class definition installed into a [`MockVm`].
#[derive(Clone, Debug)]
pub struct MockClass {
    pub name: String,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
    pub constructors: Vec<String>,
    pub fields: Vec<(String, JdiValue)>,
    pub static_fields: Vec<(String, JdiValue)>,
    pub methods: Vec<(String, String, MethodBehavior)>,
}

impl MockClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: Some(OBJECT.to_string()),
            interfaces: Vec::new(),
            is_interface: false,
            constructors: Vec::new(),
            fields: Vec::new(),
            static_fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            is_interface: true,
            superclass: None,
            ..Self::new(name)
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn constructor(mut self, signature: impl Into<String>) -> Self {
        self.constructors.push(signature.into());
        self
    }

    /// Instance field with the value new instances start with.
    pub fn field(mut self, name: impl Into<String>, initial: JdiValue) -> Self {
        self.fields.push((name.into(), initial));
        self
    }

    pub fn static_field(mut self, name: impl Into<String>, value: JdiValue) -> Self {
        self.static_fields.push((name.into(), value));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        signature: impl Into<String>,
        behavior: MethodBehavior,
    ) -> Self {
        self.methods.push((name.into(), signature.into(), behavior));
        self
    }
}

/// One frame of a mocked thread.
#[derive(Clone, Debug)]
pub struct MockFrame {
    pub method: MethodRef,
    pub locals: HashMap<String, JdiValue>,
}

impl MockFrame {
    pub fn new(method: MethodRef) -> Self {
        Self {
            method,
            locals: HashMap::new(),
        }
    }

    pub fn local(mut self, name: impl Into<String>, value: JdiValue) -> Self {
        self.locals.insert(name.into(), value);
        self
    }
}

#[derive(Debug)]
struct ClassEntry {
    id: ReferenceTypeId,
    class: MockClass,
    statics: HashMap<String, JdiValue>,
}

#[derive(Debug)]
enum HeapData {
    Plain(HashMap<String, JdiValue>),
    Str(String),
    Array(Vec<JdiValue>),
}

#[derive(Debug)]
struct HeapObject {
    runtime_type: String,
    data: HeapData,
}

#[derive(Debug)]
struct MockThread {
    suspended: bool,
    by_event: bool,
    /// Bottom frame first.
    frames: Vec<MockFrame>,
}

#[derive(Debug)]
struct State {
    connected: bool,
    alive: bool,
    next_id: u64,
    classes: HashMap<String, ClassEntry>,
    array_types: HashMap<String, ReferenceTypeId>,
    objects: HashMap<ObjectId, HeapObject>,
    threads: HashMap<ThreadId, MockThread>,
    calls: Vec<String>,
}

/// Deterministic, in-memory [`VirtualMachine`] test double.
///
/// Comes with `java.lang.Object` and `java.lang.String` preinstalled. Every
/// side-effecting operation (instantiation, invocation, writes) is appended to
/// a call log so tests can assert on what reached the "debuggee".
pub struct MockVm {
    state: Mutex<State>,
}

impl Default for MockVm {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVm {
    pub fn new() -> Self {
        let vm = Self {
            state: Mutex::new(State {
                connected: true,
                alive: true,
                next_id: 1,
                classes: HashMap::new(),
                array_types: HashMap::new(),
                objects: HashMap::new(),
                threads: HashMap::new(),
                calls: Vec::new(),
            }),
        };
        let mut object = MockClass::new(OBJECT);
        object.superclass = None;
        vm.add_class(object);
        vm.add_class(MockClass::new(STRING));
        vm
    }

    pub fn add_class(&self, class: MockClass) -> ReferenceType {
        let mut state = self.state.lock();
        let id = state.alloc_id();
        let statics = class.static_fields.iter().cloned().collect();
        let ty = ReferenceType {
            id,
            name: class.name.clone(),
            kind: if class.is_interface {
                TypeKind::Interface
            } else {
                TypeKind::Class
            },
        };
        state.classes.insert(
            class.name.clone(),
            ClassEntry {
                id,
                class,
                statics,
            },
        );
        ty
    }

    /// Register a thread suspended by an event with the given frames (bottom
    /// frame first).
    pub fn add_thread(&self, thread: ThreadId, frames: Vec<MockFrame>) {
        self.state.lock().threads.insert(
            thread,
            MockThread {
                suspended: true,
                by_event: true,
                frames,
            },
        );
    }

    pub fn resume_thread(&self, thread: ThreadId) {
        if let Some(t) = self.state.lock().threads.get_mut(&thread) {
            t.suspended = false;
        }
    }

    /// Suspend `thread`; `by_event == false` models a user "pause" which does
    /// not allow method invocation.
    pub fn suspend_thread(&self, thread: ThreadId, by_event: bool) {
        if let Some(t) = self.state.lock().threads.get_mut(&thread) {
            t.suspended = true;
            t.by_event = by_event;
        }
    }

    pub fn disconnect(&self) {
        tracing::debug!(target = "nova.jdi", "mock VM disconnected");
        self.state.lock().connected = false;
    }

    pub fn terminate(&self) {
        tracing::debug!(target = "nova.jdi", "mock VM terminated");
        self.state.lock().alive = false;
    }

    pub fn new_object(&self, type_name: &str) -> ObjectRef {
        let mut state = self.state.lock();
        let fields = state.initial_fields(type_name);
        state.alloc_object(type_name, HeapData::Plain(fields))
    }

    pub fn new_string(&self, value: &str) -> ObjectRef {
        self.state
            .lock()
            .alloc_object(STRING, HeapData::Str(value.to_string()))
    }

    pub fn new_array_of(&self, array_type: &str, elements: Vec<JdiValue>) -> ObjectRef {
        self.state
            .lock()
            .alloc_object(array_type, HeapData::Array(elements))
    }

    /// Peek at an instance field without going through the call log.
    pub fn field_value(&self, object: &ObjectRef, name: &str) -> Option<JdiValue> {
        match &self.state.lock().objects.get(&object.id)?.data {
            HeapData::Plain(fields) => fields.get(name).cloned(),
            _ => None,
        }
    }

    pub fn local(&self, thread: ThreadId, name: &str) -> Option<JdiValue> {
        let state = self.state.lock();
        state
            .threads
            .get(&thread)?
            .frames
            .last()?
            .locals
            .get(name)
            .cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn check_alive(&self) -> Result<()> {
        self.state.lock().check_alive()
    }
}

impl State {
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn alloc_object(&mut self, runtime_type: &str, data: HeapData) -> ObjectRef {
        let id = self.alloc_id();
        self.objects.insert(
            id,
            HeapObject {
                runtime_type: runtime_type.to_string(),
                data,
            },
        );
        ObjectRef {
            id,
            runtime_type: runtime_type.to_string(),
        }
    }

    fn check_alive(&self) -> Result<()> {
        if !self.alive {
            return Err(JdiError::VmDied);
        }
        if !self.connected {
            return Err(JdiError::VmDisconnected);
        }
        Ok(())
    }

    fn check_suspended(&self, thread: ThreadId) -> Result<&MockThread> {
        self.check_alive()?;
        match self.threads.get(&thread) {
            Some(t) if t.suspended => Ok(t),
            _ => Err(JdiError::ThreadNotSuspended(thread)),
        }
    }

    fn check_invocation_thread(&self, thread: ThreadId) -> Result<()> {
        if !self.check_suspended(thread)?.by_event {
            return Err(JdiError::IncompatibleThreadState(thread));
        }
        Ok(())
    }

    /// `name` and its supertypes, most specific first.
    fn hierarchy(&self, name: &str) -> Vec<&ClassEntry> {
        let mut out = Vec::new();
        let mut pending = vec![name.to_string()];
        while let Some(next) = pending.pop() {
            let Some(entry) = self.classes.get(&next) else {
                continue;
            };
            if out.iter().any(|e: &&ClassEntry| e.id == entry.id) {
                continue;
            }
            out.push(entry);
            for interface in entry.class.interfaces.iter().rev() {
                pending.push(interface.clone());
            }
            if let Some(superclass) = &entry.class.superclass {
                pending.push(superclass.clone());
            }
        }
        out
    }

    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        if let (Some(sub_elem), Some(sup_elem)) = (sub.strip_suffix("[]"), sup.strip_suffix("[]")) {
            if PrimitiveKind::from_name(sub_elem).is_some()
                || PrimitiveKind::from_name(sup_elem).is_some()
            {
                return sub_elem == sup_elem;
            }
            return self.is_subtype(sub_elem, sup_elem);
        }
        if sup == OBJECT {
            return PrimitiveKind::from_name(sub).is_none();
        }
        self.hierarchy(sub).iter().any(|entry| entry.class.name == sup)
    }

    fn initial_fields(&self, type_name: &str) -> HashMap<String, JdiValue> {
        let mut fields = HashMap::new();
        for entry in self.hierarchy(type_name).iter().rev() {
            for (name, value) in &entry.class.fields {
                fields.insert(name.clone(), value.clone());
            }
        }
        fields
    }

    fn find_method(&self, type_name: &str, name: &str, signature: &str) -> Option<MethodBehavior> {
        self.resolve_method(type_name, name, signature)
            .map(|(_, behavior)| behavior)
    }

    /// Declaring class and behavior of the most specific match.
    fn resolve_method(
        &self,
        type_name: &str,
        name: &str,
        signature: &str,
    ) -> Option<(String, MethodBehavior)> {
        self.hierarchy(type_name).into_iter().find_map(|entry| {
            entry
                .class
                .methods
                .iter()
                .find(|(n, s, _)| n == name && s == signature)
                .map(|(_, _, behavior)| (entry.class.name.clone(), behavior.clone()))
        })
    }

    fn reference_type_for(&mut self, name: &str) -> Result<ReferenceType> {
        if let Some(entry) = self.classes.get(name) {
            return Ok(ReferenceType {
                id: entry.id,
                name: name.to_string(),
                kind: if entry.class.is_interface {
                    TypeKind::Interface
                } else {
                    TypeKind::Class
                },
            });
        }
        if let Some(component) = name.strip_suffix("[]") {
            if PrimitiveKind::from_name(component).is_none() {
                self.reference_type_for(component)?;
            }
            let id = match self.array_types.get(name) {
                Some(id) => *id,
                None => {
                    let id = self.alloc_id();
                    self.array_types.insert(name.to_string(), id);
                    id
                }
            };
            return Ok(ReferenceType {
                id,
                name: name.to_string(),
                kind: TypeKind::Array,
            });
        }
        Err(JdiError::ClassNotLoaded(name.to_string()))
    }

    fn object(&self, object: &ObjectRef) -> Result<&HeapObject> {
        self.check_alive()?;
        self.objects
            .get(&object.id)
            .ok_or(JdiError::InvalidObjectId(object.id))
    }

    fn object_mut(&mut self, object: &ObjectRef) -> Result<&mut HeapObject> {
        self.check_alive()?;
        self.objects
            .get_mut(&object.id)
            .ok_or(JdiError::InvalidObjectId(object.id))
    }

    fn array(&self, array: &ObjectRef) -> Result<&Vec<JdiValue>> {
        match &self.object(array)?.data {
            HeapData::Array(elements) => Ok(elements),
            _ => Err(JdiError::InvalidType(format!(
                "{} is not an array",
                array.runtime_type
            ))),
        }
    }

    fn frame_mut(&mut self, thread: ThreadId, frame: usize) -> Result<&mut MockFrame> {
        self.check_suspended(thread)?;
        let frames = &mut self
            .threads
            .get_mut(&thread)
            .ok_or(JdiError::ThreadNotSuspended(thread))?
            .frames;
        let len = frames.len();
        if frame >= len {
            return Err(JdiError::Other(format!(
                "frame {frame} out of range for thread {thread}"
            )));
        }
        Ok(&mut frames[len - 1 - frame])
    }

    fn throw(&mut self, exception_type: &str) -> JdiError {
        let fields = self.initial_fields(exception_type);
        let exception = self.alloc_object(exception_type, HeapData::Plain(fields));
        JdiError::InvocationException { exception }
    }
}

fn default_value(type_name: &str) -> JdiValue {
    match PrimitiveKind::from_name(type_name) {
        Some(PrimitiveKind::Boolean) => JdiValue::Boolean(false),
        Some(PrimitiveKind::Byte) => JdiValue::Byte(0),
        Some(PrimitiveKind::Char) => JdiValue::Char(0),
        Some(PrimitiveKind::Short) => JdiValue::Short(0),
        Some(PrimitiveKind::Int) => JdiValue::Int(0),
        Some(PrimitiveKind::Long) => JdiValue::Long(0),
        Some(PrimitiveKind::Float) => JdiValue::Float(0.0),
        Some(PrimitiveKind::Double) => JdiValue::Double(0.0),
        None => JdiValue::Null,
    }
}

impl MockVm {
    fn run_behavior(&self, behavior: MethodBehavior, args: &[JdiValue]) -> Result<JdiValue> {
        match behavior {
            MethodBehavior::Return(value) => Ok(value),
            MethodBehavior::ReturnString(value) => Ok(JdiValue::Object(self.new_string(&value))),
            MethodBehavior::Throw(ty) => {
                tracing::debug!(target = "nova.jdi", exception = %ty, "invocation throws");
                Err(self.state.lock().throw(&ty))
            }
            MethodBehavior::Hook(hook) => {
                let result = hook(args);
                // The debuggee may have gone away while the hook "ran".
                self.check_alive()?;
                result
            }
        }
    }
}

impl VirtualMachine for MockVm {
    fn mirror_of_string(&self, value: &str) -> Result<ObjectRef> {
        self.check_alive()?;
        Ok(self.new_string(value))
    }

    fn class_by_name(&self, name: &str) -> Result<ReferenceType> {
        let mut state = self.state.lock();
        state.check_alive()?;
        state.reference_type_for(name)
    }

    fn reference_type(&self, object: &ObjectRef) -> Result<ReferenceType> {
        let mut state = self.state.lock();
        let runtime_type = state.object(object)?.runtime_type.clone();
        state.reference_type_for(&runtime_type)
    }

    fn is_assignable(&self, object: &ObjectRef, target: &ReferenceType) -> Result<bool> {
        let state = self.state.lock();
        let runtime_type = &state.object(object)?.runtime_type;
        Ok(state.is_subtype(runtime_type, &target.name))
    }

    fn new_instance(
        &self,
        class: &ReferenceType,
        signature: &str,
        args: &[JdiValue],
        thread: ThreadId,
    ) -> Result<JdiValue> {
        let mut state = self.state.lock();
        state.check_invocation_thread(thread)?;
        let entry = state
            .classes
            .get(&class.name)
            .ok_or_else(|| JdiError::ClassNotLoaded(class.name.clone()))?;
        if entry.class.is_interface {
            return Err(JdiError::InvalidType(format!(
                "{} is an interface",
                class.name
            )));
        }
        if !entry.class.constructors.iter().any(|s| s == signature) {
            return Err(JdiError::NoSuchMethod {
                type_name: class.name.clone(),
                name: "<init>".to_string(),
                signature: signature.to_string(),
            });
        }
        state
            .calls
            .push(format!("new {}{signature} {args:?}", class.name));
        let fields = state.initial_fields(&class.name);
        Ok(JdiValue::Object(
            state.alloc_object(&class.name, HeapData::Plain(fields)),
        ))
    }

    fn invoke_method(
        &self,
        receiver: &ObjectRef,
        name: &str,
        signature: &str,
        args: &[JdiValue],
        thread: ThreadId,
    ) -> Result<JdiValue> {
        let behavior = {
            let mut state = self.state.lock();
            state.check_invocation_thread(thread)?;
            let object = state.object(receiver)?;
            let runtime_type = object.runtime_type.clone();
            let own_string = match &object.data {
                HeapData::Str(_) => Some(receiver.clone()),
                _ => None,
            };
            state
                .calls
                .push(format!("invoke {runtime_type}.{name}{signature} {args:?}"));
            match state.find_method(&runtime_type, name, signature) {
                Some(behavior) => behavior,
                None if name == "toString" && signature == TO_STRING_SIG => {
                    let text = match own_string {
                        Some(string) => return Ok(JdiValue::Object(string)),
                        None => format!("{runtime_type}@{:x}", receiver.id),
                    };
                    MethodBehavior::ReturnString(text)
                }
                None => {
                    return Err(JdiError::NoSuchMethod {
                        type_name: runtime_type,
                        name: name.to_string(),
                        signature: signature.to_string(),
                    })
                }
            }
        };
        self.run_behavior(behavior, args)
    }

    fn invoke_static_method(
        &self,
        class: &ReferenceType,
        name: &str,
        signature: &str,
        args: &[JdiValue],
        thread: ThreadId,
    ) -> Result<JdiValue> {
        let behavior = {
            let mut state = self.state.lock();
            state.check_invocation_thread(thread)?;
            state
                .calls
                .push(format!("invokestatic {}.{name}{signature} {args:?}", class.name));
            state
                .find_method(&class.name, name, signature)
                .ok_or_else(|| JdiError::NoSuchMethod {
                    type_name: class.name.clone(),
                    name: name.to_string(),
                    signature: signature.to_string(),
                })?
        };
        self.run_behavior(behavior, args)
    }

    fn method_declaring_type(
        &self,
        class: &ReferenceType,
        name: &str,
        signature: &str,
    ) -> Result<ReferenceType> {
        let mut state = self.state.lock();
        state.check_alive()?;
        let declaring = match state.resolve_method(&class.name, name, signature) {
            Some((declaring, _)) => declaring,
            // Built-in `toString()`, see `invoke_method`.
            None if name == "toString" && signature == TO_STRING_SIG => {
                if class.name == STRING {
                    STRING.to_string()
                } else {
                    OBJECT.to_string()
                }
            }
            None => {
                return Err(JdiError::NoSuchMethod {
                    type_name: class.name.clone(),
                    name: name.to_string(),
                    signature: signature.to_string(),
                })
            }
        };
        state.reference_type_for(&declaring)
    }

    fn get_field(&self, object: &ObjectRef, name: &str) -> Result<JdiValue> {
        let state = self.state.lock();
        match &state.object(object)?.data {
            HeapData::Plain(fields) => fields.get(name).cloned(),
            _ => None,
        }
        .ok_or_else(|| JdiError::NoSuchField {
            type_name: object.runtime_type.clone(),
            name: name.to_string(),
        })
    }

    fn set_field(&self, object: &ObjectRef, name: &str, value: JdiValue) -> Result<()> {
        let mut state = self.state.lock();
        let heap = state.object_mut(object)?;
        let slot = match &mut heap.data {
            HeapData::Plain(fields) => fields.get_mut(name),
            _ => None,
        }
        .ok_or_else(|| JdiError::NoSuchField {
            type_name: object.runtime_type.clone(),
            name: name.to_string(),
        })?;
        *slot = value.clone();
        state
            .calls
            .push(format!("set {}.{name} = {value:?}", object.runtime_type));
        Ok(())
    }

    fn get_static_field(&self, class: &ReferenceType, name: &str) -> Result<JdiValue> {
        let state = self.state.lock();
        state.check_alive()?;
        state
            .hierarchy(&class.name)
            .into_iter()
            .find_map(|entry| entry.statics.get(name).cloned())
            .ok_or_else(|| JdiError::NoSuchField {
                type_name: class.name.clone(),
                name: name.to_string(),
            })
    }

    fn set_static_field(&self, class: &ReferenceType, name: &str, value: JdiValue) -> Result<()> {
        let mut state = self.state.lock();
        state.check_alive()?;
        let owner = state
            .hierarchy(&class.name)
            .into_iter()
            .find(|entry| entry.statics.contains_key(name))
            .map(|entry| entry.class.name.clone())
            .ok_or_else(|| JdiError::NoSuchField {
                type_name: class.name.clone(),
                name: name.to_string(),
            })?;
        if let Some(entry) = state.classes.get_mut(&owner) {
            entry.statics.insert(name.to_string(), value.clone());
        }
        state
            .calls
            .push(format!("set {owner}.{name} = {value:?}"));
        Ok(())
    }

    fn array_length(&self, array: &ObjectRef) -> Result<usize> {
        Ok(self.state.lock().array(array)?.len())
    }

    fn array_element(&self, array: &ObjectRef, index: usize) -> Result<JdiValue> {
        let state = self.state.lock();
        let elements = state.array(array)?;
        elements
            .get(index)
            .cloned()
            .ok_or(JdiError::InvalidIndex {
                index: index as i64,
                length: elements.len(),
            })
    }

    fn set_array_element(&self, array: &ObjectRef, index: usize, value: JdiValue) -> Result<()> {
        let mut state = self.state.lock();
        let heap = state.object_mut(array)?;
        let HeapData::Array(elements) = &mut heap.data else {
            return Err(JdiError::InvalidType(format!(
                "{} is not an array",
                array.runtime_type
            )));
        };
        let length = elements.len();
        let slot = elements.get_mut(index).ok_or(JdiError::InvalidIndex {
            index: index as i64,
            length,
        })?;
        *slot = value.clone();
        state
            .calls
            .push(format!("set {}[{index}] = {value:?}", array.runtime_type));
        Ok(())
    }

    fn new_array(&self, array_type: &ReferenceType, length: usize) -> Result<ObjectRef> {
        let mut state = self.state.lock();
        state.check_alive()?;
        let component = array_type.component_type_name().ok_or_else(|| {
            JdiError::InvalidType(format!("{} is not an array type", array_type.name))
        })?;
        let elements = vec![default_value(component); length];
        state
            .calls
            .push(format!("new {}[{length}]", component));
        Ok(state.alloc_object(&array_type.name, HeapData::Array(elements)))
    }

    fn string_value(&self, string: &ObjectRef) -> Result<String> {
        let state = self.state.lock();
        match &state.object(string)?.data {
            HeapData::Str(value) => Ok(value.clone()),
            _ => Err(JdiError::InvalidType(format!(
                "{} is not a string",
                string.runtime_type
            ))),
        }
    }

    fn local_value(&self, thread: ThreadId, frame: usize, name: &str) -> Result<JdiValue> {
        let mut state = self.state.lock();
        state
            .frame_mut(thread, frame)?
            .locals
            .get(name)
            .cloned()
            .ok_or_else(|| JdiError::Other(format!("no local variable `{name}`")))
    }

    fn set_local_value(
        &self,
        thread: ThreadId,
        frame: usize,
        name: &str,
        value: JdiValue,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let slot = state
            .frame_mut(thread, frame)?
            .locals
            .get_mut(name)
            .ok_or_else(|| JdiError::Other(format!("no local variable `{name}`")))?;
        *slot = value.clone();
        state.calls.push(format!("set local {name} = {value:?}"));
        Ok(())
    }

    fn frame_count(&self, thread: ThreadId) -> Result<usize> {
        Ok(self.state.lock().check_suspended(thread)?.frames.len())
    }

    fn is_suspended(&self, thread: ThreadId) -> Result<bool> {
        let state = self.state.lock();
        state.check_alive()?;
        Ok(state.threads.get(&thread).is_some_and(|t| t.suspended))
    }
}
