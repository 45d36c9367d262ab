//! Output writers: emit the IR as source code.

mod python;

pub use python::PythonWriter;
