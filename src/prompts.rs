//! Prompt construction for the generation and validation calls, plus
//! normalization of what comes back.
//!
//! Both prompts are few-shot: the generation prompt shows one well-written
//! docstring before asking for a new one, and the validation prompt walks
//! through one deliberately wrong example before presenting the real code.

/// The docstring half of the few-shot example pair.
const EXAMPLE_DOCSTRING: &str = r#"
Updates the docstring of a specified function within a Python source file.

This function reads a Python file, parses its source code to find the function
with the given name, and then replaces its existing docstring with the
provided new docstring. The updated source code is then written back to the
same file, effectively updating the file in-place.

Parameters:
  filename (str): The path to the Python source file where the function
                  whose docstring is to be updated is located.
  function_name (str): The name of the function whose docstring needs
                       updating. The function should be defined at the
                       top level of the module (not nested inside other
                       classes or functions).
  new_docstring (str): The new docstring content that will replace the
                       existing docstring of the specified function.

Raises:
  FileNotFoundError: If the file specified by `filename` does not exist.
  SyntaxError: If the source code in `filename` is not valid Python code.
  ValueError: If no function with the name `function_name` exists in the
              file, or if the file contains no functions at all.

Returns:
  None: The function does not return any value. It modifies the file directly.

Note:
  This function does not handle functions defined within classes or other
  scopes; only top-level functions are supported.
"#;

/// The code half of the few-shot example pair.
const EXAMPLE_FUNCTION: &str = r#"def update_docstring(filename, function_name, new_docstring):
    """ Hello, world! """
    with open(filename, "r") as file:
        source_code = file.read()

    tree = ast.parse(source_code)
    for node in ast.walk(tree):
        if isinstance(node, ast.FunctionDef) and node.name == function_name:
            node.body.insert(0, ast.Expr(value=ast.Str(s=new_docstring)))
            break

    with open(filename, "w") as file:
        file.write(astor.to_source(tree))"#;

/// Instruction block for creating a docstring from scratch.
const GENERATE_INSTRUCTIONS: &str = r#"Write a docstring for the following function. Do not explain your work. Use """ as the docstring delimiter. Respond with only the text of the docstring."#;

/// Instruction block for replacing an existing docstring.
const REPLACE_INSTRUCTIONS: &str = r#"Write a replacement docstring for the following function. The docstring it currently contains is outdated. Do not explain your work. Use """ as the docstring delimiter. Respond with only the text of the docstring."#;

/// The criteria and reply protocol for validation calls.
const VALIDATE_INSTRUCTIONS: &str = r#"Check whether the docstring in the following function meets the following criteria:

1. The docstring in the function must accurately reflect the code in the function.
2. The docstring in the function should follow the pattern shown in the example docstring.

If both point 1 and point 2 are met, reply with just the single word "correct"
If either point fails, respond with "incorrect: " followed by an explanation."#;

/// The deliberately mis-documented function shown in the validation prompt.
const WORKED_EXAMPLE_CODE: &str = r#"def load_file(filename):
    """ List all files in a directory """
    with open(filename, "r") as infile:
        file_content = infile.read()
    return file_content"#;

/// The model's expected verdict on the worked example.
const WORKED_EXAMPLE_VERDICT: &str = "incorrect: The function does not list files in a directory, it loads a file and returns the contents. It also does not adhere to the style conventions for docstrings.";

/// Build the generation prompt for one unit's source text. `replacing` is
/// true when the unit already has a docstring (visible in `code`) that the
/// reply will supersede.
pub fn generation_prompt(code: &str, replacing: bool) -> String {
    let instructions = if replacing {
        REPLACE_INSTRUCTIONS
    } else {
        GENERATE_INSTRUCTIONS
    };
    return format!(
        "{instructions}\n\n{EXAMPLE_FUNCTION}\n\n\"\"\"{EXAMPLE_DOCSTRING}\"\"\"\n\n{instructions}\n\n{code}\n"
    );
}

/// Normalize a generated reply into bare docstring text. Models often echo
/// the delimiters they were told to use, so one surrounding pair is
/// stripped. Returns `None` when the remaining text is empty or still
/// contains a delimiter; such a reply cannot be embedded and counts as a
/// failed attempt.
pub fn sanitize_generated(reply: &str) -> Option<String> {
    let mut text = reply.trim();
    if let Some(inner) = text
        .strip_prefix("\"\"\"")
        .and_then(|t| return t.strip_suffix("\"\"\""))
    {
        text = inner.trim();
    }
    if text.is_empty() || text.contains("\"\"\"") || text.contains("'''") {
        return None;
    }
    return Some(text.to_string());
}

/// Build the validation prompt for one unit's source text. The unit's
/// docstring is part of `code`; the prompt asks the model to judge it
/// against the code and the example convention.
pub fn validation_prompt(code: &str) -> String {
    return format!(
        "Here is an example of a well-written docstring for a Python function:\n\n\"\"\"{EXAMPLE_DOCSTRING}\"\"\"\n\nExamine the following code:\n{WORKED_EXAMPLE_CODE}\n\n{VALIDATE_INSTRUCTIONS}\n\n{WORKED_EXAMPLE_VERDICT}\n\nExamine the following code:\n{code}\n\n{VALIDATE_INSTRUCTIONS}\n"
    );
}
