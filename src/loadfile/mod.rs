//! EDRM XML loadfile output.
//!
//! ```text
//! <Root DataInterchangeType="Update">
//!   <Batch>
//!     <Documents>
//!       <Document DocID DocType>
//!         <Tags>  <Tag TagName TagValue TagDataType/>* </Tags>
//!         <Files> <File FileType FileName FileSize Hash?/>* </Files>
//!       </Document>*
//!     </Documents>
//!     <Relationships>
//!       <Relationship Type ParentDocID ChildDocID/>*
//!     </Relationships>
//!   </Batch>
//! </Root>
//! ```
//!
//! Element and attribute names are consumed by review platforms and must
//! not change.

mod writer;

pub use writer::{escape_attribute, write_loadfile, write_loadfile_to_dir};

/// File name of the loadfile at the root of the output directory.
pub const LOADFILE_NAME: &str = "edrm-loadfile.xml";
