//! Question templates. Each one names the exact reply shape the matching
//! parser in [`super::answer`] accepts.

use crate::edgar::SEC_BASE_URL;

pub fn company_name(company_info: &str) -> String {
    format!(
        "Tell me the company name in this SEC filer record. \
         Reply with just the company name, or NA if you can't find it.\n\n{}",
        company_info
    )
}

pub fn document_link(form: &str, table_html: &str) -> String {
    format!(
        "Find the link in this HTML table to the {form} filing document. \
         Relative links start with / and must be prefixed with {base}. \
         Reply with just the full link and nothing else. \
         If you can't find it, reply NA and nothing else.\n\n{table}",
        form = form,
        base = SEC_BASE_URL,
        table = table_html
    )
}

pub fn table_links(table_html: &str) -> String {
    format!(
        "List every document link in this HTML table, separated by commas. \
         Relative links start with / and must be prefixed with {base}. \
         Reply with just the links. If there are none, reply NA and nothing else.\n\n{table}",
        base = SEC_BASE_URL,
        table = table_html
    )
}

pub fn looks_like_filing(form: &str, text: &str) -> String {
    format!(
        "Does this text look like an {} filing? \
         Reply with exactly yes or no and nothing else.\n\n{}",
        form, text
    )
}

pub fn product_lookup(text: &str) -> String {
    format!(
        "Look in this 8-K filing to see if it announces new product launches. \
         If it does, summarize the launches in a few short sentences. \
         If there aren't any, reply NA and nothing else.\n\n{}",
        text
    )
}

pub fn excerpt_mentions_launch(company: &str, excerpt: &str) -> String {
    format!(
        "Does this excerpt from a filing by {} announce a new product launch? \
         Reply with exactly yes or no and nothing else.\n\n{}",
        company, excerpt
    )
}

pub fn product_names(text: &str) -> String {
    format!(
        "Take a look at this text and list the names of the products being launched, \
         separated by commas. Reply with just the names. \
         If there aren't any, reply NA and nothing else.\n\n{}",
        text
    )
}

pub fn product_description(company: &str, product: &str) -> String {
    format!(
        "Write a very short description of the product: {product}. \
         If {product} isn't a product made by {company}, reply NA and nothing else.",
        product = product,
        company = company
    )
}
