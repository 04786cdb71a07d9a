//! Writer for the CPLEX LP file format.
//!
//! Variable and constraint names are made LP-safe: characters not allowed in LP names are
//! replaced by `_`, unnamed items get names like `x12` or `c3`, and clashing names are made
//! unique by appending the index. Ranged rows are written as two rows, `<name>_lo` and
//! `<name>_up`.

use std::collections::HashSet;
use std::io::Write;

use itertools::izip;

use crate::model::{ProblemData, Sense};

const TERMS_PER_LINE : usize = 8;

fn is_lp_name_char(c : char) -> bool {
    c.is_ascii_alphanumeric() || "!\"#$%&()/,.;?@_`'{}|~".contains(c)
}

fn sanitize(name : Option<&str>, prefix : char, index : usize, used : &mut HashSet<String>) -> String {
    let mut s : String = match name {
        Some(n) if ! n.is_empty() => n.chars().map(|c| if is_lp_name_char(c) { c } else { '_' }).collect(),
        _ => format!("{}{}",prefix,index),
    };
    if s.starts_with(|c : char| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E') {
        s.insert(0,'_');
    }
    if used.contains(&s) {
        s = format!("{}_{}",s,index);
        while used.contains(&s) { s.push('_'); }
    }
    used.insert(s.clone());
    s
}

fn write_terms<W : Write>(w : &mut W, names : &[String], subj : &[usize], cof : &[f64]) -> std::io::Result<()> {
    for (k,(&j,&c)) in izip!(subj.iter(),cof.iter()).enumerate() {
        if k > 0 && k % TERMS_PER_LINE == 0 { write!(w,"\n   ")?; }
        if c < 0.0 { write!(w," - {} {}",-c,names[j])?; }
        else       { write!(w," + {} {}",c,names[j])?; }
    }
    Ok(())
}

/// Write `data` in LP format.
pub fn write_lp<W : Write>(data : &ProblemData, w : &mut W) -> std::io::Result<()> {
    let mut used = HashSet::new();
    let varnames : Vec<String> = (0..data.num_var()).map(|j| sanitize(data.var_name(j),'x',j,&mut used)).collect();
    let mut used = HashSet::new();
    let connames : Vec<String> = (0..data.num_con()).map(|i| sanitize(data.con_name(i),'c',i,&mut used)).collect();

    if let Some(name) = data.name() {
        writeln!(w,"\\ Problem: {}",name)?;
    }
    match data.sense() {
        Sense::Maximize => writeln!(w,"Maximize")?,
        Sense::Minimize => writeln!(w,"Minimize")?,
    }
    let (c_subj,c_cof,c_constant) = data.objective();
    let objname = data.objective_name().map(|n| n.chars().map(|c| if is_lp_name_char(c) { c } else { '_' }).collect::<String>()).unwrap_or_else(|| "obj".to_string());
    write!(w," {}:",objname)?;
    write_terms(w,varnames.as_slice(),c_subj,c_cof)?;
    if c_constant != 0.0 || c_subj.is_empty() {
        if c_constant < 0.0 { write!(w," - {}",-c_constant)?; } else { write!(w," + {}",c_constant)?; }
    }
    writeln!(w)?;

    writeln!(w,"Subject To")?;
    for (i,name) in connames.iter().enumerate() {
        let (subj,cof) = data.row(i);
        let (lb,ub) = data.con_bounds(i);
        let rows : Vec<(String,&str,f64)> =
            if lb == ub { vec![(name.clone(),"=",lb)] }
            else if lb > f64::NEG_INFINITY && ub < f64::INFINITY {
                vec![(format!("{}_lo",name),">=",lb),(format!("{}_up",name),"<=",ub)]
            }
            else if lb > f64::NEG_INFINITY { vec![(name.clone(),">=",lb)] }
            else if ub < f64::INFINITY { vec![(name.clone(),"<=",ub)] }
            else {
                writeln!(w,"\\ {}: free row omitted",name)?;
                vec![]
            };
        for (rowname,op,rhs) in rows {
            write!(w," {}:",rowname)?;
            if subj.is_empty() {
                match varnames.first() {
                    Some(v) => write!(w," 0 {}",v)?,
                    None => write!(w," 0")?,
                }
            }
            else {
                write_terms(w,varnames.as_slice(),subj,cof)?;
            }
            writeln!(w," {} {}",op,rhs)?;
        }
    }

    writeln!(w,"Bounds")?;
    for (j,name) in varnames.iter().enumerate() {
        let (lb,ub) = data.var_bounds(j);
        if data.is_integer(j) && lb == 0.0 && ub == 1.0 { continue; }
        if lb == f64::NEG_INFINITY && ub == f64::INFINITY { writeln!(w," {} free",name)?; }
        else if lb == ub { writeln!(w," {} = {}",name,lb)?; }
        else if lb == f64::NEG_INFINITY { writeln!(w," -inf <= {} <= {}",name,ub)?; }
        else if ub == f64::INFINITY {
            if lb != 0.0 { writeln!(w," {} >= {}",name,lb)?; }
        }
        else { writeln!(w," {} <= {} <= {}",lb,name,ub)?; }
    }

    let (binaries,generals) : (Vec<usize>,Vec<usize>) = (0..data.num_var())
        .filter(|&j| data.is_integer(j))
        .partition(|&j| data.var_bounds(j) == (0.0,1.0));
    if ! generals.is_empty() {
        writeln!(w,"General")?;
        for j in generals { writeln!(w," {}",varnames[j])?; }
    }
    if ! binaries.is_empty() {
        writeln!(w,"Binary")?;
        for j in binaries { writeln!(w," {}",varnames[j])?; }
    }

    if ! data.sos2_sets().is_empty() {
        let mut used = HashSet::new();
        writeln!(w,"SOS")?;
        for (k,s) in data.sos2_sets().iter().enumerate() {
            write!(w," {}: S2::",sanitize(s.name.as_deref(),'s',k,&mut used))?;
            for (&j,&wt) in izip!(s.subj.iter(),s.weights.iter()) {
                write!(w," {}:{}",varnames[j],wt)?;
            }
            writeln!(w)?;
        }
    }
    writeln!(w,"End")?;
    Ok(())
}

/// Render `data` in LP format as a string.
pub fn to_lp_string(data : &ProblemData) -> String {
    let mut buf = Vec::new();
    // writing to a Vec does not fail
    write_lp(data,&mut buf).ok();
    String::from_utf8_lossy(buf.as_slice()).into_owned()
}
