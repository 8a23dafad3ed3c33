// The bounded stack used for both the operand stack and the call stack.
// Capacity is fixed at construction; exceeding it is reported to the caller,
// which turns it into the appropriate fatal runtime error.

#[derive(Debug, PartialEq)]
pub struct Overflow;

#[derive(Debug)]
pub struct Stack<V> {
    cap: usize,
    repr: Vec<V>,
}

impl<V> Stack<V> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            repr: Vec::with_capacity(cap),
        }
    }

    pub fn try_push(&mut self, v: V) -> Result<(), Overflow> {
        if self.repr.len() < self.cap {
            self.repr.push(v);
            Ok(())
        } else {
            Err(Overflow)
        }
    }

    // Pop from the top of the stack.
    // The caller has to make sure that the stack is not empty.
    pub fn pop(&mut self) -> V {
        self.repr.pop().unwrap()
    }

    // Peek into the stack at the position that is `distance` elements away
    // from the stack top. `peek(0)` is the top of the stack.
    pub fn peek(&self, distance: usize) -> &V {
        &self.repr[self.repr.len() - distance - 1]
    }

    pub fn top_mut(&mut self) -> &mut V {
        let last = self.repr.len() - 1;
        &mut self.repr[last]
    }

    pub fn at(&self, index: usize) -> &V {
        &self.repr[index]
    }

    pub fn set(&mut self, index: usize, v: V) {
        self.repr[index] = v
    }

    pub fn len(&self) -> usize {
        self.repr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repr.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.repr.truncate(len)
    }

    pub fn slice_from(&self, start: usize) -> &[V] {
        &self.repr[start..]
    }
}

impl<V: Clone> Stack<V> {
    /// Extend the stack to `len` elements, filling new slots with `fill`.
    /// Used to reserve a frame's local slots before execution enters it.
    pub fn grow(&mut self, len: usize, fill: V) -> Result<(), Overflow> {
        if len > self.cap {
            return Err(Overflow);
        }
        while self.repr.len() < len {
            self.repr.push(fill.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::value::Value;

    #[test]
    fn test_stack_push_pop() {
        let mut stack: Stack<Value> = Stack::new(16);

        stack.try_push(Value::Bool(true)).unwrap();
        stack.try_push(Value::Bool(false)).unwrap();

        assert_eq!(stack.pop(), Value::Bool(false));
        assert_eq!(stack.pop(), Value::Bool(true));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_stack_peek() {
        let mut stack: Stack<Value> = Stack::new(16);

        stack.try_push(Value::Integer(1)).unwrap();
        stack.try_push(Value::Integer(2)).unwrap();
        stack.try_push(Value::Integer(3)).unwrap();

        assert_eq!(stack.peek(0), &Value::Integer(3));
        assert_eq!(stack.peek(2), &Value::Integer(1));
    }

    #[test]
    fn test_stack_overflow_is_reported() {
        let mut stack: Stack<Value> = Stack::new(2);

        stack.try_push(Value::Integer(1)).unwrap();
        stack.try_push(Value::Integer(2)).unwrap();
        assert_eq!(stack.try_push(Value::Integer(3)), Err(Overflow));
    }

    #[test]
    fn test_stack_grow_reserves_slots() {
        let mut stack: Stack<Value> = Stack::new(8);

        stack.try_push(Value::Integer(1)).unwrap();
        stack.grow(4, Value::Null).unwrap();

        assert_eq!(stack.len(), 4);
        assert_eq!(stack.at(3), &Value::Null);
        assert_eq!(stack.grow(9, Value::Null), Err(Overflow));
    }
}
